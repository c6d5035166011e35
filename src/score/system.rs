use serde_json::{json, Map, Value};

use super::{Invoker, ScoreReader};
use crate::address::{Address, SYSTEM_ADDRESS};
use crate::error::Result;
use crate::rpc::Client;
use crate::shapes;
use crate::units::to_hex;
use crate::workflow::Outcome;

// -- Reader --

pub struct SystemReader<'a> {
	score: ScoreReader<'a>,
}

impl<'a> SystemReader<'a> {
	pub fn new(client: &'a Client) -> Self {
		Self {
			score: ScoreReader::new(client, SYSTEM_ADDRESS),
		}
	}

	async fn by_address(&self, method: &str, address: &Address, shape: Option<Value>) -> Result<Value> {
		let ret = self
			.score
			.query(method, Some(json!({ "address": address.to_string() })))
			.await?;
		Ok(match shape {
			Some(shape) => shapes::convert(&ret, &shape),
			None => ret,
		})
	}

	pub async fn get_stake(&self, address: &Address) -> Result<Value> {
		self.by_address("getStake", address, Some(shapes::stake())).await
	}

	pub async fn get_delegation(&self, address: &Address) -> Result<Value> {
		self.by_address("getDelegation", address, Some(shapes::delegation()))
			.await
	}

	pub async fn get_prep(&self, address: &Address) -> Result<Value> {
		self.by_address("getPRep", address, Some(shapes::prep())).await
	}

	/// Both bounds are 1-based rankings and optional.
	pub async fn get_preps(&self, start: Option<u64>, end: Option<u64>) -> Result<Value> {
		let mut params = Map::new();
		if let Some(start) = start {
			params.insert("startRanking".into(), json!(to_hex(start.into())));
		}
		if let Some(end) = end {
			params.insert("endRanking".into(), json!(to_hex(end.into())));
		}
		let params = (!params.is_empty()).then_some(Value::Object(params));

		let ret = self.score.query("getPReps", params).await?;
		Ok(shapes::convert(&ret, &shapes::preps()))
	}

	pub async fn get_prep_stats(&self) -> Result<Value> {
		let ret = self.score.query("getPRepStats", None).await?;
		Ok(shapes::convert(&ret, &shapes::prep_stats()))
	}

	pub async fn query_iscore(&self, address: &Address) -> Result<Value> {
		self.by_address("queryIScore", address, Some(shapes::iscore())).await
	}

	/// Returned as-is: the list holds addresses only.
	pub async fn get_bonder_list(&self, address: &Address) -> Result<Value> {
		self.by_address("getBonderList", address, None).await
	}
}

// -- Writer --

pub struct SystemWriter<'a> {
	invoker: Invoker<'a>,
}

impl<'a> SystemWriter<'a> {
	pub fn new(invoker: Invoker<'a>) -> Self {
		Self { invoker }
	}

	async fn call(&mut self, method: &str, params: Option<Value>) -> Result<Outcome> {
		self.invoker.invoke(&SYSTEM_ADDRESS, method, params).await
	}

	/// Stake amount in loop.
	pub async fn set_stake(&mut self, value: u128) -> Result<Outcome> {
		self.call("setStake", Some(json!({ "value": to_hex(value) })))
			.await
	}

	pub async fn set_delegation(&mut self, delegations: &[(Address, u128)]) -> Result<Outcome> {
		let delegations: Vec<Value> = delegations
			.iter()
			.map(|(address, value)| json!({ "address": address.to_string(), "value": to_hex(*value) }))
			.collect();
		self.call("setDelegation", Some(json!({ "delegations": delegations })))
			.await
	}

	pub async fn claim_iscore(&mut self) -> Result<Outcome> {
		self.call("claimIScore", None).await
	}

	pub async fn set_bonder_list(&mut self, bonders: &[Address]) -> Result<Outcome> {
		let bonders: Vec<String> = bonders.iter().map(Address::to_string).collect();
		self.call("setBonderList", Some(json!({ "bonderList": bonders })))
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rpc::mock::MockProvider;
	use crate::signer::KeyWallet;
	use crate::tx_builder::TxHash;
	use crate::units::ICX;
	use crate::workflow::AutoConfirm;

	const HASH: &str = "0x02f2617b58d0097c1249243692a79d8a13d157e857be798b029d8320d524517a";

	fn writer<'a>(client: &'a Client, wallet: &'a KeyWallet) -> SystemWriter<'a> {
		SystemWriter::new(Invoker::new(client, wallet, 1, Box::new(AutoConfirm)))
	}

	#[tokio::test]
	async fn set_stake_then_fetch_result() {
		let provider = MockProvider::new();
		provider.respond("debug_estimateStep", json!("0x186a0"));
		provider.respond("icx_sendTransaction", json!(HASH));
		provider.respond(
			"icx_getTransactionResult",
			json!({ "status": "0x1", "txHash": HASH, "stepUsed": "0x186a0" }),
		);
		let client = Client::new(provider.clone());
		let wallet = KeyWallet::create();

		let outcome = writer(&client, &wallet)
			.set_stake(500_000_000_000_000_000_000)
			.await
			.unwrap();

		let hash = match outcome {
			Outcome::Submitted(hash) => hash,
			other => panic!("expected a submission, got {other:?}"),
		};
		assert_eq!(hash.0.len(), 32);

		let sent = provider.calls_to("icx_sendTransaction");
		assert_eq!(sent.len(), 1);
		let sent = sent[0].as_ref().unwrap();
		assert_eq!(sent["to"], SYSTEM_ADDRESS.to_string());
		assert_eq!(sent["data"]["method"], "setStake");
		assert_eq!(sent["data"]["params"]["value"], to_hex(500 * ICX));
		assert_eq!(sent["data"]["params"]["value"], "0x1b1ae4d6e2ef500000");

		let result = client.get_transaction_result(&hash).await.unwrap();
		assert!(result.get("status").is_some());
	}

	#[tokio::test]
	async fn stake_fields_are_converted() {
		let provider = MockProvider::new();
		provider.respond(
			"icx_call",
			json!({ "stake": "0x3e8", "unstakes": [] }),
		);
		let client = Client::new(provider.clone());
		let address: Address = "hx0000000000000000000000000000000000000001".parse().unwrap();

		let stake = SystemReader::new(&client).get_stake(&address).await.unwrap();
		assert_eq!(stake["stake"], 1000);

		let params = provider.calls_to("icx_call").remove(0).unwrap();
		assert_eq!(params["to"], SYSTEM_ADDRESS.to_string());
		assert_eq!(params["data"]["method"], "getStake");
	}

	#[tokio::test]
	async fn preps_uses_optional_rankings() {
		let provider = MockProvider::new();
		provider.respond("icx_call", json!({ "blockHeight": "0x10", "preps": [] }));
		let client = Client::new(provider.clone());
		let reader = SystemReader::new(&client);

		reader.get_preps(None, None).await.unwrap();
		reader.get_preps(Some(1), Some(22)).await.unwrap();

		let calls = provider.calls_to("icx_call");
		assert_eq!(calls[0].as_ref().unwrap()["data"], json!({ "method": "getPReps" }));
		assert_eq!(
			calls[1].as_ref().unwrap()["data"]["params"],
			json!({ "startRanking": "0x1", "endRanking": "0x16" })
		);
	}

	#[tokio::test]
	async fn delegation_and_bonder_params() {
		let provider = MockProvider::new();
		provider.respond("icx_sendTransaction", json!(HASH));
		let client = Client::new(provider.clone());
		let wallet = KeyWallet::create();
		let prep: Address = "hx0000000000000000000000000000000000000002".parse().unwrap();

		let mut w = SystemWriter::new(
			Invoker::new(&client, &wallet, 1, Box::new(AutoConfirm)).step_limit(200_000),
		);
		w.set_delegation(&[(prep, 10 * ICX)]).await.unwrap();
		w.set_bonder_list(&[prep]).await.unwrap();

		let sent = provider.calls_to("icx_sendTransaction");
		assert_eq!(
			sent[0].as_ref().unwrap()["data"]["params"],
			json!({ "delegations": [{ "address": prep.to_string(), "value": "0x8ac7230489e80000" }] })
		);
		assert_eq!(
			sent[1].as_ref().unwrap()["data"]["params"],
			json!({ "bonderList": [prep.to_string()] })
		);
		assert!(provider.calls_to("debug_estimateStep").is_empty());
	}

	#[tokio::test]
	async fn claim_has_no_params() {
		let provider = MockProvider::new();
		provider.respond("debug_estimateStep", json!("0x1000"));
		provider.respond("icx_sendTransaction", json!(HASH));
		let client = Client::new(provider.clone());
		let wallet = KeyWallet::create();

		let outcome = writer(&client, &wallet).claim_iscore().await.unwrap();
		assert_eq!(outcome, Outcome::Submitted(HASH.parse::<TxHash>().unwrap()));

		let sent = provider.calls_to("icx_sendTransaction").remove(0).unwrap();
		assert_eq!(sent["data"], json!({ "method": "claimIScore" }));
	}
}
