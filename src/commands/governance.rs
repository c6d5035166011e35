//! Transactions sent to the governance SCORE.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::{Command, Context};
use crate::cli::{
	AcceptScoreCmd, AddAuditorCmd, AddDeployerCmd, AddImportWhiteListCmd, AddToScoreBlackListCmd,
	DeployCmd, InvokeArgs, RejectScoreCmd, RemoveAuditorCmd, RemoveDeployerCmd,
	RemoveFromScoreBlackListCmd, RemoveImportWhiteListCmd, SetMaxStepLimitCmd, SetRevisionCmd,
	SetStepCostCmd, SetStepPriceCmd, UpdateServiceConfigCmd,
};
use crate::score::governance::{self, GovernanceWriter};
use crate::workflow::Outcome;

/// Unlock the wallet and run `$body` against a fresh writer.
macro_rules! with_writer {
	($ctx:expr, $invoke:expr, |$w:ident| $body:expr) => {{
		let wallet = $ctx.wallet($invoke)?;
		let mut $w = GovernanceWriter::new($ctx.invoker(&wallet, $invoke)?);
		Ok($body.await?)
	}};
}

/// Implement [`Command`] for a governance write that takes the writer and
/// the parsed arguments.
macro_rules! governance_command {
	($cmd:ty, $name:literal, |$w:ident, $s:ident| $body:expr) => {
		#[async_trait]
		impl Command for $cmd {
			fn name(&self) -> &'static str {
				$name
			}

			fn invoke_args(&self) -> Option<&InvokeArgs> {
				Some(&self.invoke)
			}

			async fn execute(&self, ctx: &Context) -> Result<Outcome> {
				let $s = self;
				with_writer!(ctx, &$s.invoke, |$w| $body)
			}
		}
	};
}

#[async_trait]
impl Command for DeployCmd {
	fn name(&self) -> &'static str {
		"deploy"
	}

	fn invoke_args(&self) -> Option<&InvokeArgs> {
		Some(&self.invoke)
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		let params = self
			.params
			.as_deref()
			.map(serde_json::from_str::<Value>)
			.transpose()
			.context("--params must be a JSON object")?;
		if params.as_ref().is_some_and(|p| !p.is_object()) {
			anyhow::bail!("--params must be a JSON object");
		}
		with_writer!(ctx, &self.invoke, |w| w.deploy(&self.path, self.to.as_ref(), params))
	}
}

governance_command!(AcceptScoreCmd, "acceptScore", |w, s| w.accept_score(&s.tx_hash));
governance_command!(RejectScoreCmd, "rejectScore", |w, s| w.reject_score(&s.tx_hash, &s.reason));
governance_command!(AddAuditorCmd, "addAuditor", |w, s| w.add_auditor(&s.address));
governance_command!(RemoveAuditorCmd, "removeAuditor", |w, s| w.remove_auditor(&s.address));
governance_command!(SetRevisionCmd, "setRevision", |w, s| w.set_revision(s.code, &s.name));
governance_command!(SetStepPriceCmd, "setStepPrice", |w, s| w.set_step_price(s.step_price));
governance_command!(AddDeployerCmd, "addDeployer", |w, s| w.add_deployer(&s.address));
governance_command!(RemoveDeployerCmd, "removeDeployer", |w, s| w.remove_deployer(&s.address));
governance_command!(AddToScoreBlackListCmd, "addToScoreBlackList", |w, s| w
	.add_to_score_black_list(&s.address));
governance_command!(RemoveFromScoreBlackListCmd, "removeFromScoreBlackList", |w, s| w
	.remove_from_score_black_list(&s.address));
governance_command!(AddImportWhiteListCmd, "addImportWhiteList", |w, s| w
	.add_import_white_list(&s.import_stmt));
governance_command!(RemoveImportWhiteListCmd, "removeImportWhiteList", |w, s| w
	.remove_import_white_list(&s.import_stmt));
governance_command!(UpdateServiceConfigCmd, "updateServiceConfig", |w, s| w
	.update_service_config(s.service_flag));

// Enum arguments are checked before the wallet is unlocked.

#[async_trait]
impl Command for SetStepCostCmd {
	fn name(&self) -> &'static str {
		"setStepCost"
	}

	fn invoke_args(&self) -> Option<&InvokeArgs> {
		Some(&self.invoke)
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		governance::check_step_type(&self.step_type)?;
		with_writer!(ctx, &self.invoke, |w| w.set_step_cost(&self.step_type, self.cost))
	}
}

#[async_trait]
impl Command for SetMaxStepLimitCmd {
	fn name(&self) -> &'static str {
		"setMaxStepLimit"
	}

	fn invoke_args(&self) -> Option<&InvokeArgs> {
		Some(&self.invoke)
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		governance::check_context_type(&self.context_type)?;
		with_writer!(ctx, &self.invoke, |w| w.set_max_step_limit(&self.context_type, self.value))
	}
}
