use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::json;

use super::{done, Command, Context};
use crate::cli::{CreateWalletCmd, WalletCmd};
use crate::error::Error;
use crate::signer::{self, KeyWallet};
use crate::workflow::Outcome;

#[async_trait]
impl Command for WalletCmd {
	fn name(&self) -> &'static str {
		"wallet"
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		let wallet = signer::open(&self.source, || {
			ctx.password(self.password.as_deref())
				.map_err(|e| Error::Keystore(e.to_string()))
		})?;
		done(&json!({
			"address": wallet.address(),
			"publicKey": wallet.public_key_hex(),
			"privateKey": wallet.private_key_hex(),
		}))
	}
}

#[async_trait]
impl Command for CreateWalletCmd {
	fn name(&self) -> &'static str {
		"createWallet"
	}

	// Writes a file, although nothing goes on chain.
	fn is_read_only(&self) -> bool {
		false
	}

	async fn execute(&self, ctx: &Context) -> Result<Outcome> {
		if self.path.exists() {
			bail!("{} already exists", self.path.display());
		}
		let password = ctx.password(self.password.as_deref())?;
		if password.is_empty() {
			bail!("password must not be empty");
		}

		let wallet = KeyWallet::create();
		wallet.save(&self.path, &password)?;
		log::info!("created keystore {} for {}", self.path.display(), wallet.address());
		done(&json!({
			"address": wallet.address(),
			"keystore": self.path.display().to_string(),
		}))
	}
}
