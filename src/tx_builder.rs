use std::fmt;
use std::str::FromStr;

use base64::Engine;
use serde_json::{json, Map, Value};
use sha3::{Digest, Sha3_256};

use crate::address::Address;
use crate::error::{Error, Result};
use crate::signer::Signer;
use crate::units::to_hex;

const VERSION: &str = "0x3";
const SIGN_PREFIX: &str = "icx_sendTransaction";

/// Payload carried in the `data` field.
#[derive(Debug, Clone, PartialEq)]
pub enum TxData {
	Call {
		method: String,
		params: Option<Value>,
	},
	Deploy {
		content_type: String,
		content: Vec<u8>,
		params: Option<Value>,
	},
}

impl TxData {
	fn data_type(&self) -> &'static str {
		match self {
			Self::Call { .. } => "call",
			Self::Deploy { .. } => "deploy",
		}
	}

	fn to_json(&self) -> Value {
		let mut data = Map::new();
		let params = match self {
			Self::Call { method, params } => {
				data.insert("method".into(), json!(method));
				params
			}
			Self::Deploy {
				content_type,
				content,
				params,
			} => {
				data.insert("contentType".into(), json!(content_type));
				data.insert("content".into(), json!(format!("0x{}", hex::encode(content))));
				params
			}
		};
		if let Some(params) = params {
			data.insert("params".into(), params.clone());
		}
		Value::Object(data)
	}
}

// -- Builder --

/// Assembles a v3 transaction field by field.
#[derive(Debug, Default)]
pub struct TransactionBuilder {
	from: Option<Address>,
	to: Option<Address>,
	value: Option<u128>,
	step_limit: Option<u128>,
	nid: Option<u64>,
	timestamp: Option<i64>,
	data: Option<TxData>,
}

impl TransactionBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from(mut self, from: Address) -> Self {
		self.from = Some(from);
		self
	}

	pub fn to(mut self, to: Address) -> Self {
		self.to = Some(to);
		self
	}

	/// Amount in loop.
	pub fn value(mut self, value: u128) -> Self {
		self.value = Some(value);
		self
	}

	/// Zero is treated as "not set" so the caller can estimate.
	pub fn step_limit(mut self, step_limit: u128) -> Self {
		self.step_limit = (step_limit > 0).then_some(step_limit);
		self
	}

	pub fn nid(mut self, nid: u64) -> Self {
		self.nid = Some(nid);
		self
	}

	/// Override the timestamp (microseconds). Defaults to now.
	pub fn timestamp(mut self, micros: i64) -> Self {
		self.timestamp = Some(micros);
		self
	}

	pub fn call(mut self, method: impl Into<String>, params: Option<Value>) -> Self {
		self.data = Some(TxData::Call {
			method: method.into(),
			params,
		});
		self
	}

	pub fn deploy(
		mut self,
		content_type: impl Into<String>,
		content: Vec<u8>,
		params: Option<Value>,
	) -> Self {
		self.data = Some(TxData::Deploy {
			content_type: content_type.into(),
			content,
			params,
		});
		self
	}

	pub fn build(self) -> Result<Transaction> {
		Ok(Transaction {
			from: self.from.ok_or(Error::Missing("from"))?,
			to: self.to.ok_or(Error::Missing("to"))?,
			value: self.value,
			step_limit: self.step_limit,
			nid: self.nid.ok_or(Error::Missing("nid"))?,
			timestamp: self
				.timestamp
				.unwrap_or_else(|| chrono::Utc::now().timestamp_micros()),
			data: self.data,
		})
	}
}

// -- Transaction --

/// An unsigned transaction. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
	from: Address,
	to: Address,
	value: Option<u128>,
	step_limit: Option<u128>,
	nid: u64,
	timestamp: i64,
	data: Option<TxData>,
}

impl Transaction {
	pub fn step_limit(&self) -> Option<u128> {
		self.step_limit
	}

	/// The SCORE method for call transactions.
	pub fn method(&self) -> Option<&str> {
		match &self.data {
			Some(TxData::Call { method, .. }) => Some(method),
			_ => None,
		}
	}

	/// Copy suitable for `debug_estimateStep`.
	pub fn without_step_limit(&self) -> Self {
		Self {
			step_limit: None,
			..self.clone()
		}
	}

	pub fn with_step_limit(self, step_limit: u128) -> Self {
		Self {
			step_limit: Some(step_limit),
			..self
		}
	}

	/// JSON-RPC parameters without the signature.
	pub fn to_json(&self) -> Value {
		let mut tx = Map::new();
		tx.insert("version".into(), json!(VERSION));
		tx.insert("from".into(), json!(self.from.to_string()));
		tx.insert("to".into(), json!(self.to.to_string()));
		if let Some(value) = self.value {
			tx.insert("value".into(), json!(to_hex(value)));
		}
		if let Some(step_limit) = self.step_limit {
			tx.insert("stepLimit".into(), json!(to_hex(step_limit)));
		}
		tx.insert("timestamp".into(), json!(format!("{:#x}", self.timestamp)));
		tx.insert("nid".into(), json!(to_hex(self.nid.into())));
		if let Some(data) = &self.data {
			tx.insert("dataType".into(), json!(data.data_type()));
			tx.insert("data".into(), data.to_json());
		}
		Value::Object(tx)
	}

	pub fn hash(&self) -> TxHash {
		let digest = Sha3_256::digest(serialize(&self.to_json()).as_bytes());
		TxHash(digest.into())
	}

	/// Sign the transaction, consuming it so it cannot be signed twice.
	pub fn sign(self, signer: &dyn Signer) -> Result<SignedTransaction> {
		if self.step_limit.is_none() {
			return Err(Error::Missing("stepLimit"));
		}
		if signer.address() != &self.from {
			return Err(Error::invalid(
				"signer",
				format!("{} does not match from {}", signer.address(), self.from),
			));
		}

		let hash = self.hash();
		let signature = signer.sign(&hash.0)?;
		Ok(SignedTransaction {
			tx: self,
			hash,
			signature: base64::engine::general_purpose::STANDARD.encode(signature),
		})
	}
}

/// A transaction ready for `icx_sendTransaction`.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
	tx: Transaction,
	hash: TxHash,
	signature: String,
}

impl SignedTransaction {
	pub fn hash(&self) -> &TxHash {
		&self.hash
	}

	pub fn to_json(&self) -> Value {
		let mut value = self.tx.to_json();
		if let Value::Object(tx) = &mut value {
			tx.insert("signature".into(), json!(self.signature));
		}
		value
	}
}

// -- Transaction hash --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxHash(pub [u8; 32]);

impl FromStr for TxHash {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let body = s.strip_prefix("0x").unwrap_or(s);
		let bytes = hex::decode(body).map_err(|_| Error::InvalidHash(s.to_owned()))?;
		let hash: [u8; 32] = bytes
			.try_into()
			.map_err(|_| Error::InvalidHash(s.to_owned()))?;
		Ok(Self(hash))
	}
}

impl fmt::Display for TxHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(self.0))
	}
}

// -- Serialization for signing --

/// Render transaction parameters in the form whose SHA3-256 is signed.
pub fn serialize(params: &Value) -> String {
	let mut out = String::from(SIGN_PREFIX);
	if let Value::Object(fields) = params {
		for (key, value) in sorted(fields) {
			if key == "signature" {
				continue;
			}
			out.push('.');
			out.push_str(key);
			out.push('.');
			encode(value, &mut out);
		}
	}
	out
}

fn sorted(fields: &Map<String, Value>) -> Vec<(&String, &Value)> {
	let mut entries: Vec<_> = fields.iter().collect();
	entries.sort_by(|a, b| a.0.cmp(b.0));
	entries
}

fn encode(value: &Value, out: &mut String) {
	match value {
		Value::Object(fields) => {
			out.push('{');
			for (i, (key, v)) in sorted(fields).into_iter().enumerate() {
				if i > 0 {
					out.push('.');
				}
				out.push_str(key);
				out.push('.');
				encode(v, out);
			}
			out.push('}');
		}
		Value::Array(items) => {
			out.push('[');
			for (i, v) in items.iter().enumerate() {
				if i > 0 {
					out.push('.');
				}
				encode(v, out);
			}
			out.push(']');
		}
		Value::Null => out.push_str("\\0"),
		Value::String(s) => escape(s, out),
		other => escape(&other.to_string(), out),
	}
}

fn escape(s: &str, out: &mut String) {
	for c in s.chars() {
		if matches!(c, '\\' | '.' | '{' | '}' | '[' | ']') {
			out.push('\\');
		}
		out.push(c);
	}
}
