//! Staking, delegation and P-Rep commands against the system SCORE.

use anyhow::Result;
use async_trait::async_trait;

use super::{done, Command, Context};
use crate::address::Address;
use crate::cli::{
	BonderListCmd, ClaimIScoreCmd, DelegationCmd, IScoreCmd, InvokeArgs, PRepCmd, PRepStatsCmd,
	PRepsCmd, SetBonderListCmd, SetDelegationCmd, SetStakeCmd, StakeCmd,
};
use crate::score::system::{SystemReader, SystemWriter};
use crate::workflow::Outcome;

// -- Queries --

/// Queries keyed by a single account.
macro_rules! account_query {
	($cmd:ty, $name:literal, $method:ident) => {
		#[async_trait]
		impl Command for $cmd {
			fn name(&self) -> &'static str {
				$name
			}

			async fn execute(&self, ctx: &Context) -> Result<Outcome> {
				let address = ctx.account(&self.account)?;
				done(&SystemReader::new(&ctx.client).$method(&address).await?)
			}
		}
	};
}

account_query!(StakeCmd, "stake", get_stake);
account_query!(DelegationCmd, "delegation", get_delegation);
account_query!(PRepCmd, "prep", get_prep);
account_query!(IScoreCmd, "iscore", query_iscore);
account_query!(BonderListCmd, "bonderList", get_bonder_list);

#[async_trait]
impl Command for PRepsCmd {
	fn name(&self) -> &'static str {
		"preps"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		done(&SystemReader::new(&ctx.client).get_preps(self.start, self.end).await?)
	}
}

#[async_trait]
impl Command for PRepStatsCmd {
	fn name(&self) -> &'static str {
		"prepStats"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		done(&SystemReader::new(&ctx.client).get_prep_stats().await?)
	}
}

// -- Transactions --

enum Op<'a> {
	Stake(u128),
	Delegation(&'a [(Address, u128)]),
	ClaimIScore,
	BonderList(&'a [Address]),
}

async fn write(ctx: &Context, invoke: &InvokeArgs, op: Op<'_>) -> Result<Outcome> {
	let wallet = ctx.wallet(invoke)?;
	let mut writer = SystemWriter::new(ctx.invoker(&wallet, invoke)?);
	let outcome = match op {
		Op::Stake(value) => writer.set_stake(value).await?,
		Op::Delegation(delegations) => writer.set_delegation(delegations).await?,
		Op::ClaimIScore => writer.claim_iscore().await?,
		Op::BonderList(bonders) => writer.set_bonder_list(bonders).await?,
	};
	Ok(outcome)
}

#[async_trait]
impl Command for SetStakeCmd {
	fn name(&self) -> &'static str {
		"setStake"
	}

	fn invoke_args(&self) -> Option<&InvokeArgs> {
		Some(&self.invoke)
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		write(ctx, &self.invoke, Op::Stake(self.value)).await
	}
}

#[async_trait]
impl Command for SetDelegationCmd {
	fn name(&self) -> &'static str {
		"setDelegation"
	}

	fn invoke_args(&self) -> Option<&InvokeArgs> {
		Some(&self.invoke)
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		write(ctx, &self.invoke, Op::Delegation(&self.delegations)).await
	}
}

#[async_trait]
impl Command for ClaimIScoreCmd {
	fn name(&self) -> &'static str {
		"claimIScore"
	}

	fn invoke_args(&self) -> Option<&InvokeArgs> {
		Some(&self.invoke)
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		write(ctx, &self.invoke, Op::ClaimIScore).await
	}
}

#[async_trait]
impl Command for SetBonderListCmd {
	fn name(&self) -> &'static str {
		"setBonderList"
	}

	fn invoke_args(&self) -> Option<&InvokeArgs> {
		Some(&self.invoke)
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		write(ctx, &self.invoke, Op::BonderList(&self.bonders)).await
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::address::SYSTEM_ADDRESS;
	use crate::cli::AccountArg;
	use crate::commands::testing::*;
	use crate::rpc::mock::MockProvider;
	use crate::units::ICX;

	#[tokio::test]
	async fn set_stake_sends_loop_value() {
		let provider = MockProvider::new();
		provider.respond("debug_estimateStep", json!("0x1d4c0"));
		provider.respond("icx_sendTransaction", json!(HASH));
		let ctx = context(&provider);

		let cmd = SetStakeCmd {
			value: 500 * ICX,
			invoke: invoke(),
		};
		assert_eq!(cmd.execute(&ctx).await.unwrap(), Outcome::Submitted(HASH.parse().unwrap()));

		let sent = provider.calls_to("icx_sendTransaction").remove(0).unwrap();
		assert_eq!(sent["to"], SYSTEM_ADDRESS.to_string());
		assert_eq!(sent["data"]["params"]["value"], "0x1b1ae4d6e2ef500000");
		assert_eq!(sent["stepLimit"], "0x1d4c0");
	}

	#[tokio::test]
	async fn explicit_step_limit_skips_estimation() {
		let provider = MockProvider::new();
		provider.respond("icx_sendTransaction", json!(HASH));
		let ctx = context(&provider);

		let cmd = ClaimIScoreCmd {
			invoke: InvokeArgs {
				step_limit: Some(150_000),
				..invoke()
			},
		};
		cmd.execute(&ctx).await.unwrap();
		assert_eq!(provider.methods(), ["icx_sendTransaction"]);
	}

	#[tokio::test]
	async fn missing_keystore_fails_before_any_request() {
		let provider = MockProvider::new();
		let ctx = context(&provider);

		let cmd = SetBonderListCmd {
			bonders: vec![],
			invoke: InvokeArgs {
				yes: true,
				..InvokeArgs::default()
			},
		};
		let err = cmd.execute(&ctx).await.unwrap_err();
		assert_eq!(err.to_string(), "keystore is required");
		assert!(provider.calls().is_empty());
	}

	#[tokio::test]
	async fn stake_query_uses_the_system_score() {
		let provider = MockProvider::new();
		provider.respond("icx_call", json!({ "stake": "0x0", "unstakes": [] }));
		let ctx = context(&provider);

		let cmd = StakeCmd {
			account: AccountArg {
				address: Some(KEY_ADDRESS.parse().unwrap()),
				keystore: None,
			},
		};
		assert!(cmd.is_read_only());
		cmd.execute(&ctx).await.unwrap();

		let call = provider.calls_to("icx_call").remove(0).unwrap();
		assert_eq!(call["to"], SYSTEM_ADDRESS.to_string());
		assert_eq!(
			call["data"],
			json!({ "method": "getStake", "params": { "address": KEY_ADDRESS } })
		);
	}
}
