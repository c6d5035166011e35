pub mod keystore;

use std::path::Path;

use crate::address::Address;
use crate::error::{Error, Result};

pub use keystore::{KeyWallet, Keystore};

/// Anything that can sign transaction hashes for a single address.
///
/// The CLI only ships the local keystore wallet, but the transaction
/// workflow is written against this trait so tests and other key sources
/// can stand in for it.
pub trait Signer: Send + Sync {
	/// The address this signer controls.
	fn address(&self) -> &Address;

	/// Sign a 32-byte transaction hash, returning the 64-byte compact
	/// signature followed by the one-byte recovery id.
	fn sign(&self, hash: &[u8; 32]) -> Result<[u8; 65]>;
}

/// Open a wallet from either a keystore file or a raw hex private key.
///
/// `password` is only invoked when `source` turns out to be a keystore.
pub fn open(source: &str, password: impl FnOnce() -> Result<String>) -> Result<KeyWallet> {
	let path = Path::new(source);
	if path.is_file() {
		let password = password()?;
		return KeyWallet::load(path, &password);
	}
	if looks_like_private_key(source) {
		return KeyWallet::from_private_key_hex(source);
	}
	Err(Error::Keystore(format!("no keystore file at {source}")))
}

fn looks_like_private_key(s: &str) -> bool {
	let s = s.strip_prefix("0x").unwrap_or(s);
	s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY: &str = "7a28b5ba57c53603b0b07b56bba752f7784bf506fa95edc395f5cf6c7514fe9d";

	#[test]
	fn raw_key_skips_password() {
		let wallet = open(KEY, || panic!("password must not be requested")).unwrap();
		assert_eq!(
			wallet.address().to_string(),
			"hxc252ec53611d5fa8adda84640ced6a3d50272885"
		);
	}

	#[test]
	fn missing_file_is_an_error() {
		let err = open("/nonexistent/keystore.json", || Ok("pw".into())).unwrap_err();
		assert!(matches!(err, Error::Keystore(_)));
	}
}
