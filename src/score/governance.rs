use std::path::Path;

use serde_json::{json, Value};

use super::{Invoker, Package, ScoreReader};
use crate::address::{Address, GOVERNANCE_ADDRESS};
use crate::error::{Error, Result};
use crate::rpc::Client;
use crate::shapes;
use crate::tx_builder::TxHash;
use crate::units::{self, to_hex};
use crate::workflow::Outcome;

/// Step types accepted by `setStepCost`.
pub const STEP_TYPES: [&str; 13] = [
	"default",
	"contractCall",
	"contractCreate",
	"contractUpdate",
	"contractDestruct",
	"contractSet",
	"get",
	"set",
	"replace",
	"delete",
	"input",
	"eventlog",
	"apiCall",
];

/// Context types accepted by `getMaxStepLimit` / `setMaxStepLimit`.
pub const CONTEXT_TYPES: [&str; 2] = ["invoke", "query"];

pub fn check_step_type(step_type: &str) -> Result<()> {
	if STEP_TYPES.contains(&step_type) {
		Ok(())
	} else {
		Err(Error::invalid("stepType", step_type))
	}
}

pub fn check_context_type(context_type: &str) -> Result<()> {
	if CONTEXT_TYPES.contains(&context_type) {
		Ok(())
	} else {
		Err(Error::invalid("contextType", context_type))
	}
}

// -- Reader --

pub struct GovernanceReader<'a> {
	score: ScoreReader<'a>,
}

impl<'a> GovernanceReader<'a> {
	pub fn new(client: &'a Client) -> Self {
		Self {
			score: ScoreReader::new(client, GOVERNANCE_ADDRESS),
		}
	}

	pub async fn get_version(&self) -> Result<Value> {
		self.score.query("getVersion", None).await
	}

	pub async fn get_revision(&self) -> Result<Value> {
		let ret = self.score.query("getRevision", None).await?;
		Ok(shapes::convert(&ret, &shapes::revision()))
	}

	pub async fn get_service_config(&self) -> Result<Value> {
		self.score.query("getServiceConfig", None).await
	}

	pub async fn get_score_status(&self, address: &Address) -> Result<Value> {
		self.score
			.query("getScoreStatus", Some(json!({ "address": address.to_string() })))
			.await
	}

	pub async fn get_step_price(&self) -> Result<u128> {
		let ret = self.score.query("getStepPrice", None).await?;
		units::value_to_int(&ret)
	}

	pub async fn get_step_costs(&self) -> Result<Value> {
		let ret = self.score.query("getStepCosts", None).await?;
		Ok(shapes::convert_all(&ret))
	}

	pub async fn get_max_step_limit(&self, context_type: &str) -> Result<u128> {
		check_context_type(context_type)?;
		let ret = self
			.score
			.query("getMaxStepLimit", Some(json!({ "contextType": context_type })))
			.await?;
		units::value_to_int(&ret)
	}

	pub async fn is_deployer(&self, address: &Address) -> Result<bool> {
		self.flag("isDeployer", json!({ "address": address.to_string() }))
			.await
	}

	pub async fn is_in_score_black_list(&self, address: &Address) -> Result<bool> {
		self.flag("isInScoreBlackList", json!({ "address": address.to_string() }))
			.await
	}

	pub async fn is_in_import_white_list(&self, import_stmt: &str) -> Result<bool> {
		self.flag("isInImportWhiteList", json!({ "importStmt": import_stmt }))
			.await
	}

	pub async fn is_auditor(&self, address: &Address) -> Result<bool> {
		self.flag("isAuditor", json!({ "address": address.to_string() }))
			.await
	}

	async fn flag(&self, method: &str, params: Value) -> Result<bool> {
		let ret = self.score.query(method, Some(params)).await?;
		units::value_to_bool(&ret)
	}
}

// -- Writer --

pub struct GovernanceWriter<'a> {
	invoker: Invoker<'a>,
}

impl<'a> GovernanceWriter<'a> {
	pub fn new(invoker: Invoker<'a>) -> Self {
		Self { invoker }
	}

	async fn call(&mut self, method: &str, params: Option<Value>) -> Result<Outcome> {
		self.invoker.invoke(&GOVERNANCE_ADDRESS, method, params).await
	}

	/// Deploy SCORE code. Without `to` the governance SCORE itself is
	/// updated; the zero address installs a new SCORE.
	pub async fn deploy(
		&mut self,
		path: &Path,
		to: Option<&Address>,
		params: Option<Value>,
	) -> Result<Outcome> {
		let to = to.copied().unwrap_or(GOVERNANCE_ADDRESS);
		if !to.is_contract() {
			return Err(Error::invalid("deploy target", to.to_string()));
		}
		let package = Package::from_path(path)?;
		self.invoker.deploy(&to, package, params).await
	}

	pub async fn accept_score(&mut self, tx_hash: &TxHash) -> Result<Outcome> {
		self.call("acceptScore", Some(json!({ "txHash": tx_hash.to_string() })))
			.await
	}

	pub async fn reject_score(&mut self, tx_hash: &TxHash, reason: &str) -> Result<Outcome> {
		self.call(
			"rejectScore",
			Some(json!({ "txHash": tx_hash.to_string(), "reason": reason })),
		)
		.await
	}

	pub async fn add_auditor(&mut self, address: &Address) -> Result<Outcome> {
		self.call("addAuditor", Some(json!({ "address": address.to_string() })))
			.await
	}

	pub async fn remove_auditor(&mut self, address: &Address) -> Result<Outcome> {
		self.call("removeAuditor", Some(json!({ "address": address.to_string() })))
			.await
	}

	pub async fn set_revision(&mut self, code: u128, name: &str) -> Result<Outcome> {
		self.call(
			"setRevision",
			Some(json!({ "code": to_hex(code), "name": name })),
		)
		.await
	}

	pub async fn set_step_price(&mut self, step_price: u128) -> Result<Outcome> {
		log::debug!("set_step_price: {step_price}");
		self.call("setStepPrice", Some(json!({ "stepPrice": to_hex(step_price) })))
			.await
	}

	pub async fn set_step_cost(&mut self, step_type: &str, cost: u128) -> Result<Outcome> {
		check_step_type(step_type)?;
		self.call(
			"setStepCost",
			Some(json!({ "stepType": step_type, "cost": to_hex(cost) })),
		)
		.await
	}

	pub async fn set_max_step_limit(&mut self, context_type: &str, value: u128) -> Result<Outcome> {
		check_context_type(context_type)?;
		self.call(
			"setMaxStepLimit",
			Some(json!({ "contextType": context_type, "value": to_hex(value) })),
		)
		.await
	}

	pub async fn add_deployer(&mut self, address: &Address) -> Result<Outcome> {
		self.call("addDeployer", Some(json!({ "address": address.to_string() })))
			.await
	}

	pub async fn remove_deployer(&mut self, address: &Address) -> Result<Outcome> {
		self.call("removeDeployer", Some(json!({ "address": address.to_string() })))
			.await
	}

	pub async fn add_to_score_black_list(&mut self, address: &Address) -> Result<Outcome> {
		self.call("addToScoreBlackList", Some(json!({ "address": address.to_string() })))
			.await
	}

	pub async fn remove_from_score_black_list(&mut self, address: &Address) -> Result<Outcome> {
		self.call(
			"removeFromScoreBlackList",
			Some(json!({ "address": address.to_string() })),
		)
		.await
	}

	pub async fn add_import_white_list(&mut self, import_stmt: &str) -> Result<Outcome> {
		self.call("addImportWhiteList", Some(json!({ "importStmt": import_stmt })))
			.await
	}

	pub async fn remove_import_white_list(&mut self, import_stmt: &str) -> Result<Outcome> {
		self.call("removeImportWhiteList", Some(json!({ "importStmt": import_stmt })))
			.await
	}

	pub async fn update_service_config(&mut self, service_flag: u128) -> Result<Outcome> {
		self.call(
			"updateServiceConfig",
			Some(json!({ "serviceFlag": to_hex(service_flag) })),
		)
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rpc::mock::MockProvider;
	use crate::signer::KeyWallet;
	use crate::workflow::AutoConfirm;

	const HASH: &str = "0x02f2617b58d0097c1249243692a79d8a13d157e857be798b029d8320d524517a";

	fn sending() -> MockProvider {
		let provider = MockProvider::new();
		provider.respond("debug_estimateStep", json!("0x186a0"));
		provider.respond("icx_sendTransaction", json!(HASH));
		provider
	}

	#[test]
	fn allow_lists() {
		for t in STEP_TYPES {
			assert!(check_step_type(t).is_ok());
		}
		assert!(check_step_type("contractcall").is_err());
		assert!(check_context_type("invoke").is_ok());
		assert!(check_context_type("query").is_ok());
		assert!(matches!(
			check_context_type("deploy"),
			Err(Error::InvalidArgument { kind: "contextType", .. })
		));
	}

	#[tokio::test]
	async fn revision_and_step_price_are_integers() {
		let provider = MockProvider::new();
		provider.respond("icx_call", json!({ "code": "0x3e8", "name": "1.7.0" }));
		let client = Client::new(provider.clone());
		let reader = GovernanceReader::new(&client);

		let revision = reader.get_revision().await.unwrap();
		assert_eq!(revision["code"], 1000);

		let provider = MockProvider::new();
		provider.respond("icx_call", json!("0x2e90edd00"));
		let client = Client::new(provider);
		assert_eq!(GovernanceReader::new(&client).get_step_price().await.unwrap(), 12_500_000_000);
	}

	#[tokio::test]
	async fn is_auditor_sends_the_address() {
		let provider = MockProvider::new();
		provider.respond("icx_call", json!("0x1"));
		let client = Client::new(provider.clone());
		let address: Address = "hx0000000000000000000000000000000000000001".parse().unwrap();

		assert!(GovernanceReader::new(&client).is_auditor(&address).await.unwrap());

		let params = provider.calls_to("icx_call").remove(0).unwrap();
		assert_eq!(params["data"]["method"], "isAuditor");
		assert_eq!(params["data"]["params"]["address"], address.to_string());
	}

	#[tokio::test]
	async fn invalid_context_type_makes_no_call() {
		let provider = MockProvider::new();
		let client = Client::new(provider.clone());

		assert!(GovernanceReader::new(&client).get_max_step_limit("deploy").await.is_err());
		assert!(provider.calls().is_empty());
	}

	#[tokio::test]
	async fn invalid_step_type_makes_no_call() {
		let provider = sending();
		let client = Client::new(provider.clone());
		let wallet = KeyWallet::create();
		let mut writer = GovernanceWriter::new(Invoker::new(&client, &wallet, 3, Box::new(AutoConfirm)));

		assert!(writer.set_step_cost("gas", 100).await.is_err());
		assert!(provider.calls().is_empty());
	}

	#[tokio::test]
	async fn set_revision_targets_governance() {
		let provider = sending();
		let client = Client::new(provider.clone());
		let wallet = KeyWallet::create();
		let mut writer = GovernanceWriter::new(Invoker::new(&client, &wallet, 3, Box::new(AutoConfirm)));

		let outcome = writer.set_revision(17, "1.8.0").await.unwrap();
		assert_eq!(outcome, Outcome::Submitted(HASH.parse().unwrap()));

		let sent = provider.calls_to("icx_sendTransaction").remove(0).unwrap();
		assert_eq!(sent["to"], GOVERNANCE_ADDRESS.to_string());
		assert_eq!(sent["from"], wallet.address().to_string());
		assert_eq!(sent["nid"], "0x3");
		assert_eq!(sent["data"]["method"], "setRevision");
		assert_eq!(sent["data"]["params"], json!({ "code": "0x11", "name": "1.8.0" }));
	}

	#[tokio::test]
	async fn deploy_updates_governance_by_default() {
		let tmp = tempfile::tempdir().unwrap();
		let dir = tmp.path().join("governance");
		std::fs::create_dir(&dir).unwrap();
		std::fs::write(dir.join("package.json"), "{}").unwrap();

		let provider = sending();
		let client = Client::new(provider.clone());
		let wallet = KeyWallet::create();
		let mut writer = GovernanceWriter::new(Invoker::new(&client, &wallet, 3, Box::new(AutoConfirm)));

		writer.deploy(&dir, None, None).await.unwrap();

		let sent = provider.calls_to("icx_sendTransaction").remove(0).unwrap();
		assert_eq!(sent["to"], GOVERNANCE_ADDRESS.to_string());
		assert_eq!(sent["dataType"], "deploy");
		assert_eq!(sent["data"]["contentType"], "application/zip");
		assert!(sent["data"]["content"].as_str().unwrap().starts_with("0x504b"));
	}

	#[tokio::test]
	async fn deploy_target_must_be_a_contract() {
		let provider = MockProvider::new();
		let client = Client::new(provider.clone());
		let wallet = KeyWallet::create();
		let mut writer = GovernanceWriter::new(Invoker::new(&client, &wallet, 3, Box::new(AutoConfirm)));

		let eoa: Address = "hx0000000000000000000000000000000000000002".parse().unwrap();
		let err = writer
			.deploy(Path::new("score.zip"), Some(&eoa), None)
			.await
			.unwrap_err();
		assert!(matches!(err, Error::InvalidArgument { kind: "deploy target", .. }));
		assert!(provider.calls().is_empty());
	}
}
