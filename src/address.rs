use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};

use crate::error::{Error, Result};

/// Distinguishes externally-owned accounts (`hx`) from contracts (`cx`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressPrefix {
	Eoa,
	Contract,
}

impl AddressPrefix {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Eoa => "hx",
			Self::Contract => "cx",
		}
	}
}

/// A 20-byte account identifier tagged with its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
	prefix: AddressPrefix,
	body: [u8; 20],
}

/// The system SCORE; also used as the target of fresh deployments.
pub const SYSTEM_ADDRESS: Address = Address::from_int(AddressPrefix::Contract, 0);

/// The governance SCORE.
pub const GOVERNANCE_ADDRESS: Address = Address::from_int(AddressPrefix::Contract, 1);

impl Address {
	pub const fn new(prefix: AddressPrefix, body: [u8; 20]) -> Self {
		Self { prefix, body }
	}

	/// Build an address whose body is `n` in big-endian, left-padded.
	pub const fn from_int(prefix: AddressPrefix, n: u128) -> Self {
		let bytes = n.to_be_bytes();
		let mut body = [0u8; 20];
		let mut i = 0;
		while i < 16 {
			body[4 + i] = bytes[i];
			i += 1;
		}
		Self { prefix, body }
	}

	/// Derive an EOA address from a 65-byte uncompressed public key:
	/// the last 20 bytes of SHA3-256 over the key without its 0x04 marker.
	pub fn from_public_key(public_key: &[u8; 65]) -> Self {
		let digest = Sha3_256::digest(&public_key[1..]);
		let mut body = [0u8; 20];
		body.copy_from_slice(&digest[12..]);
		Self::new(AddressPrefix::Eoa, body)
	}

	pub fn is_contract(&self) -> bool {
		self.prefix == AddressPrefix::Contract
	}
}

impl FromStr for Address {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let invalid = || Error::InvalidAddress(s.to_owned());

		if s.len() != 42 || !s.is_ascii() {
			return Err(invalid());
		}
		let prefix = match &s[..2] {
			"hx" => AddressPrefix::Eoa,
			"cx" => AddressPrefix::Contract,
			_ => return Err(invalid()),
		};
		let hex_part = &s[2..];
		// Only the lowercase form is canonical on chain.
		if hex_part.chars().any(|c| c.is_ascii_uppercase()) {
			return Err(invalid());
		}

		let mut body = [0u8; 20];
		hex::decode_to_slice(hex_part, &mut body).map_err(|_| invalid())?;
		Ok(Self::new(prefix, body))
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{}", self.prefix.as_str(), hex::encode(self.body))
	}
}

impl Serialize for Address {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for Address {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}
