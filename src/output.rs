use serde_json::Value;

/// Width of the section titles.
pub const COLUMN: usize = 80;

/// `==== Title ====` centred in [`COLUMN`] characters.
pub fn title(text: &str) -> String {
	format!("{:=^width$}", format!(" {text} "), width = COLUMN)
}

/// Pretty JSON for objects and arrays, raw text for strings.
pub fn render(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
	}
}

pub fn print_title(text: &str) {
	println!("{}", title(text));
}

pub fn print_request(request: &Value) {
	print_title("Request");
	println!("{}\n", render(request));
}

pub fn print_response(response: &Value) {
	print_title("Response");
	println!("{}\n", render(response));
}

pub fn print_result(result: &Value) {
	print_title("Result");
	println!("{}\n", render(result));
}
