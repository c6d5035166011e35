//! Response shapes for the node's hex-encoded integers.
//!
//! A shape mirrors the JSON the node returns: every field marked `"int"`
//! holds a hex string that is turned into a native integer before it is
//! shown to the operator.  Objects recurse per field, a one-element array
//! applies its element shape to every item, and anything the shape does
//! not mention passes through untouched.

use serde_json::{json, Map, Value};

use crate::units;

const INT: &str = "int";

/// Rewrite `value` according to `shape`.
pub fn convert(value: &Value, shape: &Value) -> Value {
	match (value, shape) {
		(Value::String(s), Value::String(kind)) if kind == INT => units::parse_signed(s)
			.map(units::int_value)
			.unwrap_or_else(|_| value.clone()),
		(Value::Object(fields), Value::Object(template)) => {
			let converted: Map<String, Value> = fields
				.iter()
				.map(|(key, v)| {
					let v = match template.get(key) {
						Some(s) => convert(v, s),
						None => v.clone(),
					};
					(key.clone(), v)
				})
				.collect();
			Value::Object(converted)
		}
		(Value::Array(items), Value::Array(template)) if template.len() == 1 => {
			Value::Array(items.iter().map(|item| convert(item, &template[0])).collect())
		}
		_ => value.clone(),
	}
}

/// Convert every value of a flat object, e.g. `getStepCosts`.
pub fn convert_all(value: &Value) -> Value {
	match value {
		Value::Object(fields) => {
			Value::Object(fields.iter().map(|(k, v)| (k.clone(), convert(v, &json!(INT)))).collect())
		}
		other => other.clone(),
	}
}

// -- Governance --

pub fn revision() -> Value {
	json!({ "code": INT })
}

// -- System --

pub fn stake() -> Value {
	json!({
		"stake": INT,
		"unstakes": [{ "unstake": INT, "unstakeBlockHeight": INT, "remainingBlocks": INT }],
	})
}

pub fn delegation() -> Value {
	json!({
		"totalDelegated": INT,
		"votingPower": INT,
		"delegations": [{ "value": INT }],
	})
}

pub fn prep() -> Value {
	json!({
		"blockHeight": INT,
		"bonded": INT,
		"delegated": INT,
		"power": INT,
		"irep": INT,
		"irepUpdateBlockHeight": INT,
		"lastGenerateBlockHeight": INT,
		"lastHeight": INT,
		"totalBlocks": INT,
		"unvalidatedSequenceBlocks": INT,
		"validatedBlocks": INT,
		"grade": INT,
		"penalty": INT,
		"status": INT,
		"stake": INT,
		"txIndex": INT,
	})
}

pub fn preps() -> Value {
	json!({
		"blockHeight": INT,
		"startRanking": INT,
		"totalDelegated": INT,
		"totalStake": INT,
		"preps": [prep()],
	})
}

pub fn prep_stats() -> Value {
	json!({
		"blockHeight": INT,
		"preps": [{
			"blockHeight": INT,
			"grade": INT,
			"status": INT,
			"penalties": INT,
			"lastHeight": INT,
			"lastState": INT,
			"total": INT,
			"fail": INT,
			"realTotal": INT,
			"realFail": INT,
			"failCont": INT,
		}],
	})
}

pub fn iscore() -> Value {
	json!({ "blockHeight": INT, "estimatedICX": INT, "iscore": INT })
}

// -- Node --

pub fn status() -> Value {
	json!({ "lastBlock": { "blockHeight": INT, "timestamp": INT } })
}

pub fn account() -> Value {
	json!({
		"balance": INT,
		"stake": stake(),
		"delegation": delegation(),
	})
}

pub fn tx_result() -> Value {
	json!({
		"status": INT,
		"blockHeight": INT,
		"txIndex": INT,
		"stepUsed": INT,
		"stepPrice": INT,
		"cumulativeStepUsed": INT,
		"eventLogs": [{}],
	})
}
