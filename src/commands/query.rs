//! Read-only commands against the node and the governance SCORE.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;

use super::{done, Command, Context};
use crate::address::GOVERNANCE_ADDRESS;
use crate::cli::{
	AccountCmd, BalanceCmd, BlockCmd, BlockHeaderByHeightCmd, DataByHashCmd, InImportWhiteListCmd,
	InScoreBlackListCmd, IsAuditorCmd, IsDeployerCmd, MaxStepLimitCmd, RevisionCmd, ScoreApiCmd,
	ScoreStatusCmd, ServiceConfigCmd, StatusCmd, StepCostsCmd, StepPriceCmd, TxCmd, TxResultCmd,
	VersionCmd, VotesByHeightCmd,
};
use crate::score::governance::GovernanceReader;
use crate::shapes;
use crate::tx_builder::TxHash;
use crate::units;
use crate::workflow::Outcome;

// -- Node --

#[async_trait]
impl Command for AccountCmd {
	fn name(&self) -> &'static str {
		"account"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		let address = ctx.account(&self.account)?;
		let ret = ctx.client.get_account(&address, self.filter).await?;
		done(&shapes::convert(&ret, &shapes::account()))
	}
}

#[async_trait]
impl Command for BalanceCmd {
	fn name(&self) -> &'static str {
		"balance"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		let address = ctx.account(&self.account)?;
		let balance = ctx.client.get_balance(&address).await?;
		done(&json!({
			"address": address,
			"balance": units::uint_value(balance),
			"icx": units::loop_to_icx(balance),
		}))
	}
}

/// How a `block` argument selects a block.
#[derive(Debug, PartialEq)]
enum BlockSelector {
	Last,
	Height(u64),
	Hash(TxHash),
}

impl BlockSelector {
	fn parse(value: Option<&str>) -> Result<Self> {
		let Some(value) = value else {
			return Ok(Self::Last);
		};
		if let Ok(hash) = value.parse::<TxHash>() {
			return Ok(Self::Hash(hash));
		}
		let height = units::parse_int(value).map_err(|_| anyhow!("invalid block hash or height: {value}"))?;
		let height = u64::try_from(height).map_err(|_| anyhow!("block height out of range: {value}"))?;
		Ok(Self::Height(height))
	}
}

#[async_trait]
impl Command for BlockCmd {
	fn name(&self) -> &'static str {
		"block"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		let ret = match BlockSelector::parse(self.value.as_deref())? {
			BlockSelector::Last => ctx.client.get_last_block().await?,
			BlockSelector::Height(height) => ctx.client.get_block_by_height(height).await?,
			BlockSelector::Hash(hash) => ctx.client.get_block_by_hash(&hash).await?,
		};
		done(&ret)
	}
}

#[async_trait]
impl Command for TxCmd {
	fn name(&self) -> &'static str {
		"tx"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		done(&ctx.client.get_transaction(&self.tx_hash).await?)
	}
}

#[async_trait]
impl Command for TxResultCmd {
	fn name(&self) -> &'static str {
		"txresult"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		let ret = ctx.client.get_transaction_result(&self.tx_hash).await?;
		done(&shapes::convert(&ret, &shapes::tx_result()))
	}
}

#[async_trait]
impl Command for ScoreApiCmd {
	fn name(&self) -> &'static str {
		"scoreApi"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		let address = self.address.unwrap_or(GOVERNANCE_ADDRESS);
		done(&ctx.client.get_score_api(&address).await?)
	}
}

#[async_trait]
impl Command for StatusCmd {
	fn name(&self) -> &'static str {
		"status"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		let ret = ctx.client.get_status(&self.filter).await?;
		done(&shapes::convert(&ret, &shapes::status()))
	}
}

// -- Consensus data --

/// Raw payloads are printed as 0x-prefixed hex.
fn done_bytes(bytes: &[u8]) -> Result<Outcome> {
	done(&json!(format!("0x{}", hex::encode(bytes))))
}

#[async_trait]
impl Command for DataByHashCmd {
	fn name(&self) -> &'static str {
		"dataByHash"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		done_bytes(&ctx.client.get_data_by_hash(&self.data_hash).await?)
	}
}

#[async_trait]
impl Command for BlockHeaderByHeightCmd {
	fn name(&self) -> &'static str {
		"blockHeaderByHeight"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		done_bytes(&ctx.client.get_block_header_by_height(self.height).await?)
	}
}

#[async_trait]
impl Command for VotesByHeightCmd {
	fn name(&self) -> &'static str {
		"votesByHeight"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		done_bytes(&ctx.client.get_votes_by_height(self.height).await?)
	}
}

// -- Governance SCORE --

#[async_trait]
impl Command for VersionCmd {
	fn name(&self) -> &'static str {
		"version"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		done(&GovernanceReader::new(&ctx.client).get_version().await?)
	}
}

#[async_trait]
impl Command for RevisionCmd {
	fn name(&self) -> &'static str {
		"revision"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		done(&GovernanceReader::new(&ctx.client).get_revision().await?)
	}
}

#[async_trait]
impl Command for ServiceConfigCmd {
	fn name(&self) -> &'static str {
		"serviceConfig"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		done(&GovernanceReader::new(&ctx.client).get_service_config().await?)
	}
}

#[async_trait]
impl Command for ScoreStatusCmd {
	fn name(&self) -> &'static str {
		"scoreStatus"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		done(&GovernanceReader::new(&ctx.client).get_score_status(&self.address).await?)
	}
}

#[async_trait]
impl Command for StepPriceCmd {
	fn name(&self) -> &'static str {
		"stepPrice"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		let price = GovernanceReader::new(&ctx.client).get_step_price().await?;
		done(&units::uint_value(price))
	}
}

#[async_trait]
impl Command for StepCostsCmd {
	fn name(&self) -> &'static str {
		"stepCosts"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		done(&GovernanceReader::new(&ctx.client).get_step_costs().await?)
	}
}

#[async_trait]
impl Command for MaxStepLimitCmd {
	fn name(&self) -> &'static str {
		"maxStepLimit"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		let limit = GovernanceReader::new(&ctx.client)
			.get_max_step_limit(&self.context_type)
			.await?;
		done(&units::uint_value(limit))
	}
}

#[async_trait]
impl Command for IsDeployerCmd {
	fn name(&self) -> &'static str {
		"isDeployer"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		let ret = GovernanceReader::new(&ctx.client).is_deployer(&self.address).await?;
		done(&json!(ret))
	}
}

#[async_trait]
impl Command for InScoreBlackListCmd {
	fn name(&self) -> &'static str {
		"inScoreBlackList"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		let ret = GovernanceReader::new(&ctx.client)
			.is_in_score_black_list(&self.address)
			.await?;
		done(&json!(ret))
	}
}

#[async_trait]
impl Command for InImportWhiteListCmd {
	fn name(&self) -> &'static str {
		"inImportWhiteList"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		let ret = GovernanceReader::new(&ctx.client)
			.is_in_import_white_list(&self.import_stmt)
			.await?;
		done(&json!(ret))
	}
}

#[async_trait]
impl Command for IsAuditorCmd {
	fn name(&self) -> &'static str {
		"isAuditor"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		let ret = GovernanceReader::new(&ctx.client).is_auditor(&self.address).await?;
		done(&json!(ret))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cli::AccountArg;
	use crate::commands::testing::*;
	use crate::rpc::mock::MockProvider;

	fn address_arg() -> AccountArg {
		AccountArg {
			address: Some(KEY_ADDRESS.parse().unwrap()),
			keystore: None,
		}
	}

	#[test]
	fn block_selector() {
		assert_eq!(BlockSelector::parse(None).unwrap(), BlockSelector::Last);
		assert_eq!(BlockSelector::parse(Some("100")).unwrap(), BlockSelector::Height(100));
		assert_eq!(BlockSelector::parse(Some("0x64")).unwrap(), BlockSelector::Height(100));
		assert_eq!(
			BlockSelector::parse(Some(HASH)).unwrap(),
			BlockSelector::Hash(HASH.parse().unwrap())
		);
		assert!(BlockSelector::parse(Some("latest")).is_err());
	}

	#[tokio::test]
	async fn block_dispatches_by_selector() {
		let provider = MockProvider::new();
		provider.respond("icx_getLastBlock", json!({ "height": 1 }));
		provider.respond("icx_getBlockByHeight", json!({ "height": 16 }));
		let ctx = context(&provider);

		BlockCmd { value: None }.execute(&ctx).await.unwrap();
		BlockCmd {
			value: Some("16".into()),
		}
		.execute(&ctx)
		.await
		.unwrap();

		assert_eq!(provider.methods(), ["icx_getLastBlock", "icx_getBlockByHeight"]);
		assert_eq!(
			provider.calls_to("icx_getBlockByHeight")[0],
			Some(json!({ "height": "0x10" }))
		);
	}

	#[tokio::test]
	async fn consensus_queries_send_height_and_hash() {
		let provider = MockProvider::new();
		provider.respond("icx_getDataByHash", json!("3q2+7w=="));
		provider.respond("icx_getBlockHeaderByHeight", json!("AQID"));
		provider.respond("icx_getVotesByHeight", json!("AQID"));
		let ctx = context(&provider);

		let data = DataByHashCmd {
			data_hash: HASH.parse().unwrap(),
		};
		assert!(data.is_read_only());
		assert_eq!(data.execute(&ctx).await.unwrap(), Outcome::Done);
		BlockHeaderByHeightCmd { height: 16 }.execute(&ctx).await.unwrap();
		VotesByHeightCmd { height: 16 }.execute(&ctx).await.unwrap();

		assert_eq!(
			provider.methods(),
			["icx_getDataByHash", "icx_getBlockHeaderByHeight", "icx_getVotesByHeight"]
		);
		assert_eq!(provider.calls_to("icx_getDataByHash")[0], Some(json!({ "hash": HASH })));
		assert_eq!(
			provider.calls_to("icx_getVotesByHeight")[0],
			Some(json!({ "height": "0x10" }))
		);
	}

	#[tokio::test]
	async fn consensus_query_rejects_non_base64_payload() {
		let provider = MockProvider::new();
		provider.respond("icx_getBlockHeaderByHeight", json!(12));
		let ctx = context(&provider);

		assert!(BlockHeaderByHeightCmd { height: 1 }.execute(&ctx).await.is_err());
	}

	#[tokio::test]
	async fn account_and_balance_use_the_given_address() {
		let provider = MockProvider::new();
		provider.respond("debug_getAccount", json!({ "balance": "0xde0b6b3a7640000" }));
		provider.respond("icx_getBalance", json!("0xde0b6b3a7640000"));
		let ctx = context(&provider);

		let cmd = AccountCmd {
			account: address_arg(),
			filter: 1,
		};
		assert_eq!(cmd.execute(&ctx).await.unwrap(), Outcome::Done);

		let cmd = BalanceCmd {
			account: address_arg(),
		};
		assert_eq!(cmd.execute(&ctx).await.unwrap(), Outcome::Done);

		assert_eq!(
			provider.calls_to("debug_getAccount")[0],
			Some(json!({ "address": KEY_ADDRESS, "filter": "0x1" }))
		);
		assert_eq!(
			provider.calls_to("icx_getBalance")[0],
			Some(json!({ "address": KEY_ADDRESS }))
		);
	}

	#[tokio::test]
	async fn missing_address_is_reported_before_any_request() {
		let provider = MockProvider::new();
		let ctx = context(&provider);

		let cmd = BalanceCmd {
			account: AccountArg::default(),
		};
		let err = cmd.execute(&ctx).await.unwrap_err();
		assert_eq!(err.to_string(), "Address not defined");
		assert!(provider.calls().is_empty());
	}

	#[tokio::test]
	async fn score_api_defaults_to_governance() {
		let provider = MockProvider::new();
		provider.respond("icx_getScoreApi", json!([]));
		let ctx = context(&provider);

		ScoreApiCmd { address: None }.execute(&ctx).await.unwrap();
		assert_eq!(
			provider.calls_to("icx_getScoreApi")[0],
			Some(json!({ "address": GOVERNANCE_ADDRESS.to_string() }))
		);
	}

	#[tokio::test]
	async fn governance_queries_go_to_the_governance_score() {
		let provider = MockProvider::new();
		provider.respond("icx_call", json!({ "code": "0x9", "name": "1.8.0" }));
		provider.respond("icx_call", json!("0x1"));
		let ctx = context(&provider);

		RevisionCmd {}.execute(&ctx).await.unwrap();
		IsDeployerCmd {
			address: KEY_ADDRESS.parse().unwrap(),
		}
		.execute(&ctx)
		.await
		.unwrap();

		let calls = provider.calls_to("icx_call");
		for call in &calls {
			assert_eq!(call.as_ref().unwrap()["to"], GOVERNANCE_ADDRESS.to_string());
		}
		assert_eq!(calls[0].as_ref().unwrap()["data"]["method"], "getRevision");
		assert_eq!(calls[1].as_ref().unwrap()["data"]["method"], "isDeployer");
	}

	#[tokio::test]
	async fn bad_context_type_never_reaches_the_node() {
		let provider = MockProvider::new();
		let ctx = context(&provider);

		let cmd = MaxStepLimitCmd {
			context_type: "deploy".into(),
		};
		assert!(cmd.execute(&ctx).await.is_err());
		assert!(provider.calls().is_empty());
	}

	#[tokio::test]
	async fn node_errors_propagate() {
		let provider = MockProvider::new();
		provider.fail("icx_getTransactionResult", -32602, "Pending transaction");
		let ctx = context(&provider);

		let cmd = TxResultCmd {
			tx_hash: HASH.parse().unwrap(),
		};
		let err = cmd.execute(&ctx).await.unwrap_err();
		assert!(err.to_string().contains("Pending transaction"));
	}
}
