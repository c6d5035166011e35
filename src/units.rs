use serde_json::Value;

use crate::error::{Error, Result};

/// Number of loops in one ICX.
pub const ICX: u128 = 1_000_000_000_000_000_000;

const ICX_DECIMALS: usize = 18;

// -- Integer encoding --

/// Parse a non-negative integer written either in decimal or as a
/// `0x`-prefixed hex string.
pub fn parse_int(s: &str) -> Result<u128> {
	let s = s.trim();
	let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
		Some(hex) => u128::from_str_radix(hex, 16),
		None => s.parse(),
	};
	parsed.map_err(|_| Error::InvalidNumber(s.to_owned()))
}

/// Like [`parse_int`] but also accepts a leading minus sign.
pub fn parse_signed(s: &str) -> Result<i128> {
	match s.trim().strip_prefix('-') {
		Some(rest) => {
			let n = parse_int(rest)?;
			i128::try_from(n)
				.map(|n| -n)
				.map_err(|_| Error::InvalidNumber(s.to_owned()))
		}
		None => {
			let n = parse_int(s)?;
			i128::try_from(n).map_err(|_| Error::InvalidNumber(s.to_owned()))
		}
	}
}

/// Encode an integer the way the node expects it: `0x`-prefixed lowercase hex.
pub fn to_hex(n: u128) -> String {
	format!("{n:#x}")
}

/// Read an integer the node returned as a hex string.
pub fn value_to_int(value: &Value) -> Result<u128> {
	match value {
		Value::String(s) => parse_int(s),
		Value::Number(n) => n
			.as_u64()
			.map(u128::from)
			.ok_or_else(|| Error::InvalidNumber(n.to_string())),
		other => Err(Error::Response(format!("expected an integer, got {other}"))),
	}
}

/// Read a boolean the node returned as `"0x0"` / `"0x1"`.
pub fn value_to_bool(value: &Value) -> Result<bool> {
	match value {
		Value::Bool(b) => Ok(*b),
		other => Ok(value_to_int(other)? != 0),
	}
}

/// Wrap an arbitrarily large integer as a JSON number.
pub fn int_value(n: i128) -> Value {
	serde_json::Number::from_i128(n)
		.map(Value::Number)
		.unwrap_or_else(|| Value::String(n.to_string()))
}

/// Unsigned counterpart of [`int_value`] for balances and step counts.
pub fn uint_value(n: u128) -> Value {
	serde_json::Number::from_u128(n)
		.map(Value::Number)
		.unwrap_or_else(|| Value::String(n.to_string()))
}

// -- Currency --

/// Render a loop amount as a decimal ICX string, e.g. `1500000000000000000` -> `1.5`.
pub fn loop_to_icx(amount: u128) -> String {
	let whole = amount / ICX;
	let frac = amount % ICX;
	if frac == 0 {
		return whole.to_string();
	}
	let frac = format!("{frac:0width$}", width = ICX_DECIMALS);
	format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Parse a decimal ICX amount (up to 18 fractional digits) into loops.
pub fn icx_to_loop(s: &str) -> Result<u128> {
	let invalid = || Error::InvalidNumber(s.to_owned());
	let s = s.trim();
	let (whole, frac) = s.split_once('.').unwrap_or((s, ""));

	if whole.is_empty() && frac.is_empty() {
		return Err(invalid());
	}
	if frac.len() > ICX_DECIMALS || !frac.chars().all(|c| c.is_ascii_digit()) {
		return Err(invalid());
	}

	let whole: u128 = if whole.is_empty() {
		0
	} else {
		whole.parse().map_err(|_| invalid())?
	};
	let frac: u128 = if frac.is_empty() {
		0
	} else {
		let padded = format!("{frac:0<width$}", width = ICX_DECIMALS);
		padded.parse().map_err(|_| invalid())?
	};

	whole
		.checked_mul(ICX)
		.and_then(|w| w.checked_add(frac))
		.ok_or_else(invalid)
}
