use anyhow::Result;
use async_trait::async_trait;

use super::{Command, Context};
use crate::cli::{InvokeArgs, TransferCmd};
use crate::workflow::Outcome;

#[async_trait]
impl Command for TransferCmd {
	fn name(&self) -> &'static str {
		"transfer"
	}

	fn invoke_args(&self) -> Option<&InvokeArgs> {
		Some(&self.invoke)
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		let value = self.value()?;
		let wallet = ctx.wallet(&self.invoke)?;
		let mut invoker = ctx.invoker(&wallet, &self.invoke)?;
		Ok(invoker.transfer(&self.to, value).await?)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::commands::testing::*;
	use crate::rpc::mock::MockProvider;

	const TO: &str = "hx0000000000000000000000000000000000000002";

	#[tokio::test]
	async fn transfer_icx() {
		let provider = MockProvider::new();
		provider.respond("debug_estimateStep", json!("0x186a0"));
		provider.respond("icx_sendTransaction", json!(HASH));
		let ctx = context(&provider);

		let cmd = TransferCmd {
			to: TO.parse().unwrap(),
			amount: "1.5".into(),
			in_loop: false,
			invoke: invoke(),
		};
		cmd.execute(&ctx).await.unwrap();

		let estimated = provider.calls_to("debug_estimateStep").remove(0).unwrap();
		assert!(estimated.get("stepLimit").is_none());

		let sent = provider.calls_to("icx_sendTransaction").remove(0).unwrap();
		assert_eq!(sent["from"], KEY_ADDRESS);
		assert_eq!(sent["to"], TO);
		assert_eq!(sent["value"], "0x14d1120d7b160000");
		assert!(sent.get("data").is_none());
	}

	#[tokio::test]
	async fn bad_amount_is_rejected_locally() {
		let provider = MockProvider::new();
		let ctx = context(&provider);

		let cmd = TransferCmd {
			to: TO.parse().unwrap(),
			amount: "1.2.3".into(),
			in_loop: false,
			invoke: invoke(),
		};
		assert!(cmd.execute(&ctx).await.is_err());
		assert!(provider.calls().is_empty());
	}
}
