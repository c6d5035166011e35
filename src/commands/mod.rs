pub mod governance;
pub mod query;
pub mod system;
pub mod transfer;
pub mod wallet;

use std::path::Path;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::address::Address;
use crate::cli::{self, AccountArg, InvokeArgs};
use crate::config::{Env, InvokeSettings, Settings, ENV_PASSWORD};
use crate::output;
use crate::rpc::{Client, HttpProvider, LogHook, PrintHook};
use crate::score::Invoker;
use crate::shapes;
use crate::signer::{self, KeyWallet, Keystore};
use crate::units;
use crate::workflow::{self, AutoConfirm, Confirm, Mode, Outcome, PollOutcome, PromptConfirm};

/// One CLI subcommand. The argument schema lives on the clap struct that
/// implements this.
#[async_trait]
pub trait Command: Sync {
	fn name(&self) -> &'static str;

	/// Invoke flags, for commands that sign.
	fn invoke_args(&self) -> Option<&InvokeArgs> {
		None
	}

	fn is_read_only(&self) -> bool {
		self.invoke_args().is_none()
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome>;
}

impl cli::Command {
	pub fn as_command(&self) -> &dyn Command {
		use cli::Command as C;
		match self {
			C::Account(c) => c,
			C::Balance(c) => c,
			C::Block(c) => c,
			C::Tx(c) => c,
			C::TxResult(c) => c,
			C::ScoreApi(c) => c,
			C::Status(c) => c,
			C::DataByHash(c) => c,
			C::BlockHeaderByHeight(c) => c,
			C::VotesByHeight(c) => c,
			C::Version(c) => c,
			C::Revision(c) => c,
			C::ServiceConfig(c) => c,
			C::ScoreStatus(c) => c,
			C::StepPrice(c) => c,
			C::StepCosts(c) => c,
			C::MaxStepLimit(c) => c,
			C::IsDeployer(c) => c,
			C::InScoreBlackList(c) => c,
			C::InImportWhiteList(c) => c,
			C::IsAuditor(c) => c,
			C::Stake(c) => c,
			C::Delegation(c) => c,
			C::PRep(c) => c,
			C::PReps(c) => c,
			C::PRepStats(c) => c,
			C::IScore(c) => c,
			C::BonderList(c) => c,
			C::Wallet(c) => c,
			C::CreateWallet(c) => c,
			C::Deploy(c) => c,
			C::AcceptScore(c) => c,
			C::RejectScore(c) => c,
			C::AddAuditor(c) => c,
			C::RemoveAuditor(c) => c,
			C::SetRevision(c) => c,
			C::SetStepPrice(c) => c,
			C::SetStepCost(c) => c,
			C::SetMaxStepLimit(c) => c,
			C::AddDeployer(c) => c,
			C::RemoveDeployer(c) => c,
			C::AddToScoreBlackList(c) => c,
			C::RemoveFromScoreBlackList(c) => c,
			C::AddImportWhiteList(c) => c,
			C::RemoveImportWhiteList(c) => c,
			C::UpdateServiceConfig(c) => c,
			C::SetStake(c) => c,
			C::SetDelegation(c) => c,
			C::ClaimIScore(c) => c,
			C::SetBonderList(c) => c,
			C::Transfer(c) => c,
		}
	}
}

// -- Context --

/// Everything resolved before a command runs.
pub struct Context {
	pub settings: Settings,
	pub env: Env,
	pub client: Client,
}

impl Context {
	pub fn new(settings: Settings, env: Env) -> Result<Self> {
		let mut client = Client::new(HttpProvider::new(&settings.url)?).with_hook(LogHook);
		if settings.verbose {
			client = client.with_hook(PrintHook);
		}
		Ok(Self::with_client(settings, env, client))
	}

	pub fn with_client(settings: Settings, env: Env, client: Client) -> Self {
		Self {
			settings,
			env,
			client,
		}
	}

	/// `explicit` > `GOV_PASSWORD` > hidden prompt.
	pub fn password(&self, explicit: Option<&str>) -> Result<String> {
		if let Some(password) = explicit.or(self.env.get(ENV_PASSWORD).map(String::as_str)) {
			return Ok(password.to_owned());
		}
		Ok(rpassword::prompt_password("> Password: ")?)
	}

	/// Unlock the signing wallet named by the invoke flags.
	pub fn wallet(&self, args: &InvokeArgs) -> Result<KeyWallet> {
		let resolved = InvokeSettings::resolve(args, &self.env)?;
		let password = resolved.password.as_deref();
		Ok(signer::open(&resolved.keystore, || {
			self.password(password)
				.map_err(|e| crate::error::Error::Keystore(e.to_string()))
		})?)
	}

	/// Build the write pipeline for `wallet` from the invoke flags.
	pub fn invoker<'a>(&'a self, wallet: &'a KeyWallet, args: &InvokeArgs) -> Result<Invoker<'a>> {
		let resolved = InvokeSettings::resolve(args, &self.env)?;
		let nid = self.settings.require_nid()?;
		let confirm: Box<dyn Confirm> = if args.yes {
			Box::new(AutoConfirm)
		} else {
			Box::new(PromptConfirm::stdio())
		};
		let mode = if args.estimate { Mode::Estimate } else { Mode::Send };

		Ok(Invoker::new(&self.client, wallet, nid, confirm)
			.step_limit(resolved.step_limit)
			.step_margin(self.settings.step_margin)
			.mode(mode))
	}

	/// The address argument, or the one recorded in the given keystore.
	pub fn account(&self, arg: &AccountArg) -> Result<Address> {
		if let Some(address) = arg.address {
			return Ok(address);
		}
		let path = arg
			.keystore
			.as_deref()
			.ok_or_else(|| anyhow!("Address not defined"))?;
		keystore_address(path)
	}
}

fn keystore_address(path: &Path) -> Result<Address> {
	Keystore::from_file(path)?
		.address_hint()
		.ok_or_else(|| anyhow!("no address in keystore {}", path.display()))
}

// -- Running --

/// Execute `cmd` and turn its outcome into a process exit status.
pub async fn run(cmd: &dyn Command, ctx: &Context) -> Result<u8> {
	log::debug!("{} start (read-only: {})", cmd.name(), cmd.is_read_only());
	let outcome = cmd.execute(ctx).await?;
	log::debug!("{} end: {outcome:?}", cmd.name());

	let no_result = cmd.invoke_args().map_or(false, |a| a.no_result);
	finish(outcome, no_result, ctx).await
}

async fn finish(outcome: Outcome, no_result: bool, ctx: &Context) -> Result<u8> {
	match outcome {
		Outcome::Done => Ok(0),
		Outcome::Declined => Ok(1),
		Outcome::Estimated(steps) => {
			output::print_result(&json!({ "estimatedSteps": units::uint_value(steps) }));
			Ok(0)
		}
		Outcome::Submitted(hash) => {
			output::print_result(&json!(hash.to_string()));
			if no_result {
				return Ok(0);
			}
			match workflow::poll_result(&ctx.client, &hash, &ctx.settings.poll_policy()).await {
				PollOutcome::Resolved(result) => {
					let result = shapes::convert(&result, &shapes::tx_result());
					output::print_result(&result);
					Ok(if is_success(&result) { 0 } else { 1 })
				}
				PollOutcome::Exhausted => Ok(1),
			}
		}
	}
}

fn is_success(result: &Value) -> bool {
	result.get("status").and_then(Value::as_i64) == Some(1)
}

/// Print a query result and report success.
pub(crate) fn done(result: &Value) -> Result<Outcome> {
	output::print_result(result);
	Ok(Outcome::Done)
}

#[cfg(test)]
pub(crate) mod testing {
	use super::*;
	use crate::config::DEFAULT_URL;
	use crate::rpc::mock::MockProvider;

	pub const KEY: &str = "7a28b5ba57c53603b0b07b56bba752f7784bf506fa95edc395f5cf6c7514fe9d";
	pub const KEY_ADDRESS: &str = "hxc252ec53611d5fa8adda84640ced6a3d50272885";
	pub const HASH: &str = "0x02f2617b58d0097c1249243692a79d8a13d157e857be798b029d8320d524517a";

	pub fn context(provider: &MockProvider) -> Context {
		let settings = Settings {
			url: DEFAULT_URL.to_owned(),
			nid: Some(3),
			verbose: false,
			step_margin: 1.0,
			poll_attempts: 1,
		};
		Context::with_client(settings, Env::new(), Client::new(provider.clone()))
	}

	/// Invoke flags that sign with a raw key and skip the prompt.
	pub fn invoke() -> InvokeArgs {
		InvokeArgs {
			keystore: Some(KEY.to_owned()),
			yes: true,
			no_result: true,
			..InvokeArgs::default()
		}
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::testing::*;
	use super::*;
	use crate::cli::{RevisionCmd, SetStakeCmd};
	use crate::rpc::mock::MockProvider;

	#[test]
	fn read_only_follows_invoke_flags() {
		let query = RevisionCmd {};
		assert!(query.is_read_only());

		let write = SetStakeCmd {
			value: 1,
			invoke: invoke(),
		};
		assert!(!write.is_read_only());
		assert_eq!(write.name(), "setStake");
	}

	#[test]
	fn account_falls_back_to_keystore_address() {
		let provider = MockProvider::new();
		let ctx = context(&provider);

		let tmp = tempfile::tempdir().unwrap();
		let path = tmp.path().join("ks.json");
		let wallet = KeyWallet::from_private_key_hex(KEY).unwrap();
		let ks = crate::signer::keystore::Keystore::encrypt(
			&wallet,
			"pw",
			crate::signer::keystore::Kdf::Pbkdf2 { rounds: 1 },
		)
		.unwrap();
		std::fs::write(&path, serde_json::to_string(&ks).unwrap()).unwrap();

		let arg = AccountArg {
			address: None,
			keystore: Some(path),
		};
		assert_eq!(ctx.account(&arg).unwrap().to_string(), KEY_ADDRESS);

		let err = ctx.account(&AccountArg::default()).unwrap_err();
		assert_eq!(err.to_string(), "Address not defined");
	}

	#[test]
	fn writes_need_a_network_id() {
		let provider = MockProvider::new();
		let mut ctx = context(&provider);
		ctx.settings.nid = None;
		let wallet = KeyWallet::from_private_key_hex(KEY).unwrap();

		let err = ctx.invoker(&wallet, &invoke()).err().unwrap();
		assert_eq!(err.to_string(), "nid is required");
	}

	#[tokio::test]
	async fn exit_codes() {
		let provider = MockProvider::new();
		let ctx = context(&provider);

		assert_eq!(finish(Outcome::Done, false, &ctx).await.unwrap(), 0);
		assert_eq!(finish(Outcome::Declined, false, &ctx).await.unwrap(), 1);
		assert_eq!(finish(Outcome::Estimated(10), false, &ctx).await.unwrap(), 0);

		let hash = HASH.parse().unwrap();
		assert_eq!(finish(Outcome::Submitted(hash), true, &ctx).await.unwrap(), 0);
		assert!(provider.calls().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn submitted_result_decides_exit_code() {
		let provider = MockProvider::new();
		provider.respond("icx_getTransactionResult", json!({ "status": "0x1" }));
		let ctx = context(&provider);
		let hash = HASH.parse().unwrap();
		assert_eq!(finish(Outcome::Submitted(hash), false, &ctx).await.unwrap(), 0);

		let provider = MockProvider::new();
		provider.respond("icx_getTransactionResult", json!({ "status": "0x0", "failure": {} }));
		let ctx = context(&provider);
		assert_eq!(finish(Outcome::Submitted(hash), false, &ctx).await.unwrap(), 1);

		let provider = MockProvider::new();
		provider.fail("icx_getTransactionResult", -32602, "Pending transaction");
		let ctx = context(&provider);
		let started = tokio::time::Instant::now();
		assert_eq!(finish(Outcome::Submitted(hash), false, &ctx).await.unwrap(), 1);
		assert!(started.elapsed() >= Duration::from_secs(3));
	}
}
