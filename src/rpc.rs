use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use url::Url;

use crate::address::Address;
use crate::error::{Error, Result};
use crate::output;
use crate::tx_builder::{SignedTransaction, Transaction, TxHash};
use crate::units::{self, to_hex};

/// Sends one JSON-RPC request and returns its `result`.
#[async_trait]
pub trait Provider: Send + Sync {
	async fn request(&self, method: &str, params: Option<Value>) -> Result<Value>;
}

/// JSON-RPC 2.0 over HTTP.
///
/// The node serves `icx_*` and `ise_*` on `/api/v3` and the `debug_*`
/// family on `/api/v3d`; both are derived from the origin of the
/// configured URL, so any path the operator passed is ignored.
pub struct HttpProvider {
	http: reqwest::Client,
	origin: Url,
	next_id: AtomicU64,
}

impl HttpProvider {
	pub fn new(url: &str) -> Result<Self> {
		let origin = Url::parse(url).map_err(|_| Error::invalid("url", url))?;
		if origin.cannot_be_a_base() {
			return Err(Error::invalid("url", url));
		}
		Ok(Self {
			http: reqwest::Client::new(),
			origin,
			next_id: AtomicU64::new(1),
		})
	}

	fn endpoint(&self, method: &str) -> Url {
		let mut url = self.origin.clone();
		url.set_path(if method.starts_with("debug_") {
			"/api/v3d"
		} else {
			"/api/v3"
		});
		url.set_query(None);
		url
	}
}

#[async_trait]
impl Provider for HttpProvider {
	async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let mut body = json!({ "jsonrpc": "2.0", "id": id, "method": method });
		if let Some(params) = params {
			body["params"] = params;
		}

		let response = self.http.post(self.endpoint(method)).json(&body).send().await?;
		let status = response.status();
		let text = response.text().await?;

		// The node reports JSON-RPC errors with non-2xx codes, so look at
		// the body before the status.
		let envelope: Value = serde_json::from_str(&text)
			.map_err(|_| Error::Response(format!("HTTP {status}: {text}")))?;

		if let Some(err) = envelope.get("error") {
			return Err(Error::Rpc {
				code: err.get("code").and_then(Value::as_i64).unwrap_or_default(),
				message: err
					.get("message")
					.and_then(Value::as_str)
					.unwrap_or_default()
					.to_owned(),
			});
		}

		envelope
			.get("result")
			.cloned()
			.ok_or_else(|| Error::Response(format!("no result in {envelope}")))
	}
}

// -- Hooks --

/// Interceptor run around every request, in registration order.
pub trait Hook: Send + Sync {
	fn on_request(&self, _method: &str, _params: Option<&Value>) {}
	fn on_response(&self, _method: &str, _result: &Value) {}
}

/// Logs traffic through the `log` facade.
pub struct LogHook;

impl Hook for LogHook {
	fn on_request(&self, method: &str, params: Option<&Value>) {
		log::debug!("-> {method}");
		if let Some(params) = params {
			log::trace!("   {params}");
		}
	}

	fn on_response(&self, method: &str, result: &Value) {
		log::debug!("<- {method}");
		log::trace!("   {result}");
	}
}

/// Prints each request and response for `--verbose`.
pub struct PrintHook;

impl Hook for PrintHook {
	fn on_request(&self, method: &str, params: Option<&Value>) {
		let mut request = json!({ "jsonrpc": "2.0", "method": method });
		if let Some(params) = params {
			request["params"] = params.clone();
		}
		output::print_request(&request);
	}

	fn on_response(&self, _method: &str, result: &Value) {
		output::print_response(result);
	}
}

// -- Client --

/// Typed ICON JSON-RPC methods over a [`Provider`].
pub struct Client {
	provider: Box<dyn Provider>,
	hooks: Vec<Box<dyn Hook>>,
}

impl Client {
	pub fn new(provider: impl Provider + 'static) -> Self {
		Self {
			provider: Box::new(provider),
			hooks: Vec::new(),
		}
	}

	pub fn with_hook(mut self, hook: impl Hook + 'static) -> Self {
		self.hooks.push(Box::new(hook));
		self
	}

	pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
		for hook in &self.hooks {
			hook.on_request(method, params.as_ref());
		}
		let result = self.provider.request(method, params).await?;
		for hook in &self.hooks {
			hook.on_response(method, &result);
		}
		Ok(result)
	}

	// -- SCORE --

	/// Read-only SCORE call.
	pub async fn call(&self, to: &Address, method: &str, params: Option<Value>) -> Result<Value> {
		let mut data = json!({ "method": method });
		if let Some(params) = params {
			data["params"] = params;
		}
		self.request(
			"icx_call",
			Some(json!({ "to": to.to_string(), "dataType": "call", "data": data })),
		)
		.await
	}

	pub async fn get_score_api(&self, address: &Address) -> Result<Value> {
		self.request("icx_getScoreApi", Some(json!({ "address": address.to_string() })))
			.await
	}

	// -- Transactions --

	/// Ask the node how many steps `tx` would consume.
	pub async fn estimate_step(&self, tx: &Transaction) -> Result<u128> {
		let result = self
			.request("debug_estimateStep", Some(tx.without_step_limit().to_json()))
			.await?;
		units::value_to_int(&result)
	}

	/// Submit a signed transaction. Takes it by value: it is sent once.
	pub async fn send_transaction(&self, tx: SignedTransaction) -> Result<TxHash> {
		let result = self.request("icx_sendTransaction", Some(tx.to_json())).await?;
		let hash = result
			.as_str()
			.ok_or_else(|| Error::Response(format!("expected a hash, got {result}")))?;
		hash.parse()
	}

	pub async fn get_transaction_result(&self, hash: &TxHash) -> Result<Value> {
		self.request(
			"icx_getTransactionResult",
			Some(json!({ "txHash": hash.to_string() })),
		)
		.await
	}

	pub async fn get_transaction(&self, hash: &TxHash) -> Result<Value> {
		self.request(
			"icx_getTransactionByHash",
			Some(json!({ "txHash": hash.to_string() })),
		)
		.await
	}

	// -- Accounts --

	pub async fn get_balance(&self, address: &Address) -> Result<u128> {
		let result = self
			.request("icx_getBalance", Some(json!({ "address": address.to_string() })))
			.await?;
		units::value_to_int(&result)
	}

	/// `filter` is a bitmask: 1 coin, 2 stake, 4 delegation.
	pub async fn get_account(&self, address: &Address, filter: u8) -> Result<Value> {
		self.request(
			"debug_getAccount",
			Some(json!({
				"address": address.to_string(),
				"filter": to_hex(filter.into()),
			})),
		)
		.await
	}

	// -- Blocks --

	pub async fn get_block_by_height(&self, height: u64) -> Result<Value> {
		self.request(
			"icx_getBlockByHeight",
			Some(json!({ "height": to_hex(height.into()) })),
		)
		.await
	}

	/// Block hashes share the 32-byte format of transaction hashes.
	pub async fn get_block_by_hash(&self, hash: &TxHash) -> Result<Value> {
		self.request("icx_getBlockByHash", Some(json!({ "hash": hash.to_string() })))
			.await
	}

	pub async fn get_last_block(&self) -> Result<Value> {
		self.request("icx_getLastBlock", None).await
	}

	// -- Consensus data --

	/// Raw bytes stored under `hash`, such as a validator list.
	pub async fn get_data_by_hash(&self, hash: &TxHash) -> Result<Vec<u8>> {
		let result = self
			.request("icx_getDataByHash", Some(json!({ "hash": hash.to_string() })))
			.await?;
		decode_bytes(&result)
	}

	/// Encoded header of the block at `height`.
	pub async fn get_block_header_by_height(&self, height: u64) -> Result<Vec<u8>> {
		let result = self
			.request(
				"icx_getBlockHeaderByHeight",
				Some(json!({ "height": to_hex(height.into()) })),
			)
			.await?;
		decode_bytes(&result)
	}

	/// Encoded votes that finalized the block at `height`.
	pub async fn get_votes_by_height(&self, height: u64) -> Result<Vec<u8>> {
		let result = self
			.request(
				"icx_getVotesByHeight",
				Some(json!({ "height": to_hex(height.into()) })),
			)
			.await?;
		decode_bytes(&result)
	}

	// -- Node --

	pub async fn get_status(&self, filter: &[String]) -> Result<Value> {
		let params = (!filter.is_empty()).then(|| json!({ "filter": filter }));
		self.request("ise_getStatus", params).await
	}
}

/// The node returns binary payloads as base64 strings.
fn decode_bytes(result: &Value) -> Result<Vec<u8>> {
	let encoded = result
		.as_str()
		.ok_or_else(|| Error::Response(format!("expected base64 data, got {result}")))?;
	base64::engine::general_purpose::STANDARD
		.decode(encoded)
		.map_err(|e| Error::Response(format!("invalid base64 data: {e}")))
}


#[cfg(test)]
mod tests {
	use std::sync::{Arc, Mutex};

	use mockito::Matcher;

	use super::mock::MockProvider;
	use super::*;
	use crate::address::{AddressPrefix, GOVERNANCE_ADDRESS, SYSTEM_ADDRESS};
	use crate::tx_builder::TransactionBuilder;

	fn http_client(server: &mockito::Server) -> Client {
		Client::new(HttpProvider::new(&format!("{}/api/v3", server.url())).unwrap())
	}

	#[tokio::test]
	async fn icx_methods_go_to_api_v3() {
		let mut server = mockito::Server::new_async().await;
		let mock = server
			.mock("POST", "/api/v3")
			.match_body(Matcher::PartialJson(json!({
				"jsonrpc": "2.0",
				"method": "icx_getBalance",
				"params": { "address": "hx0000000000000000000000000000000000000001" },
			})))
			.with_header("content-type", "application/json")
			.with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x3e8"}"#)
			.create_async()
			.await;

		let client = http_client(&server);
		let balance = client
			.get_balance(&Address::from_int(AddressPrefix::Eoa, 1))
			.await
			.unwrap();

		assert_eq!(balance, 1000);
		mock.assert_async().await;
	}

	#[tokio::test]
	async fn debug_methods_go_to_api_v3d() {
		let mut server = mockito::Server::new_async().await;
		let mock = server
			.mock("POST", "/api/v3d")
			.match_body(Matcher::PartialJson(json!({ "method": "debug_estimateStep" })))
			.with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x186a0"}"#)
			.create_async()
			.await;

		let tx = TransactionBuilder::new()
			.from(Address::from_int(AddressPrefix::Eoa, 1))
			.to(GOVERNANCE_ADDRESS)
			.nid(3)
			.step_limit(1)
			.call("setRevision", Some(json!({ "code": "0x10", "name": "1.8.0" })))
			.build()
			.unwrap();

		let steps = http_client(&server).estimate_step(&tx).await.unwrap();
		assert_eq!(steps, 100_000);
		mock.assert_async().await;
	}

	#[tokio::test]
	async fn rpc_errors_are_surfaced() {
		let mut server = mockito::Server::new_async().await;
		server
			.mock("POST", "/api/v3")
			.with_status(400)
			.with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid params"}}"#)
			.create_async()
			.await;

		let err = http_client(&server).get_last_block().await.unwrap_err();
		match err {
			Error::Rpc { code, message } => {
				assert_eq!(code, -32602);
				assert_eq!(message, "Invalid params");
			}
			other => panic!("unexpected error: {other}"),
		}
	}

	#[tokio::test]
	async fn non_json_body_is_a_response_error() {
		let mut server = mockito::Server::new_async().await;
		server
			.mock("POST", "/api/v3")
			.with_status(502)
			.with_body("bad gateway")
			.create_async()
			.await;

		let err = http_client(&server).get_last_block().await.unwrap_err();
		assert!(matches!(err, Error::Response(_)));
	}

	#[test]
	fn rejects_unusable_urls() {
		assert!(HttpProvider::new("not a url").is_err());
		assert!(HttpProvider::new("mailto:ops@example.com").is_err());
	}

	#[tokio::test]
	async fn call_wraps_method_and_params() {
		let provider = MockProvider::new();
		provider.respond("icx_call", json!({ "code": "0x10", "name": "1.8.0" }));
		let client = Client::new(provider.clone());

		client
			.call(&GOVERNANCE_ADDRESS, "getRevision", None)
			.await
			.unwrap();

		let params = provider.calls_to("icx_call").remove(0).unwrap();
		assert_eq!(params["to"], GOVERNANCE_ADDRESS.to_string());
		assert_eq!(params["dataType"], "call");
		assert_eq!(params["data"], json!({ "method": "getRevision" }));
	}

	#[tokio::test]
	async fn status_filter_is_optional() {
		let provider = MockProvider::new();
		provider.respond("ise_getStatus", json!({}));
		let client = Client::new(provider.clone());

		client.get_status(&[]).await.unwrap();
		client.get_status(&["lastBlock".to_owned()]).await.unwrap();

		let calls = provider.calls_to("ise_getStatus");
		assert_eq!(calls[0], None);
		assert_eq!(calls[1], Some(json!({ "filter": ["lastBlock"] })));
	}

	#[tokio::test]
	async fn hooks_run_in_order() {
		struct Record(Arc<Mutex<Vec<String>>>, &'static str);
		impl Hook for Record {
			fn on_request(&self, method: &str, _: Option<&Value>) {
				self.0.lock().unwrap().push(format!("{} req {method}", self.1));
			}
			fn on_response(&self, method: &str, _: &Value) {
				self.0.lock().unwrap().push(format!("{} res {method}", self.1));
			}
		}

		let seen = Arc::new(Mutex::new(Vec::new()));
		let provider = MockProvider::new();
		provider.respond("icx_getScoreApi", json!([]));
		let client = Client::new(provider)
			.with_hook(Record(seen.clone(), "a"))
			.with_hook(Record(seen.clone(), "b"));

		client.get_score_api(&SYSTEM_ADDRESS).await.unwrap();

		assert_eq!(
			*seen.lock().unwrap(),
			[
				"a req icx_getScoreApi",
				"b req icx_getScoreApi",
				"a res icx_getScoreApi",
				"b res icx_getScoreApi",
			]
		);
	}

	#[tokio::test]
	async fn consensus_data_is_decoded_from_base64() {
		let provider = MockProvider::new();
		provider.respond("icx_getDataByHash", json!("3q2+7w=="));
		provider.respond("icx_getBlockHeaderByHeight", json!("AQID"));
		provider.respond("icx_getVotesByHeight", json!("+A=="));
		let client = Client::new(provider.clone());
		let hash: TxHash = format!("0x{}", "cd".repeat(32)).parse().unwrap();

		assert_eq!(client.get_data_by_hash(&hash).await.unwrap(), [0xde, 0xad, 0xbe, 0xef]);
		assert_eq!(client.get_block_header_by_height(100).await.unwrap(), [1, 2, 3]);
		assert_eq!(client.get_votes_by_height(100).await.unwrap(), [0xf8]);

		assert_eq!(
			provider.calls_to("icx_getDataByHash")[0],
			Some(json!({ "hash": hash.to_string() }))
		);
		assert_eq!(
			provider.calls_to("icx_getBlockHeaderByHeight")[0],
			Some(json!({ "height": "0x64" }))
		);
		assert_eq!(
			provider.calls_to("icx_getVotesByHeight")[0],
			Some(json!({ "height": "0x64" }))
		);
	}

	#[tokio::test]
	async fn consensus_data_must_be_a_base64_string() {
		let provider = MockProvider::new();
		provider.respond("icx_getVotesByHeight", json!({ "votes": [] }));
		provider.respond("icx_getDataByHash", json!("not base64!"));
		let client = Client::new(provider);
		let hash: TxHash = format!("0x{}", "cd".repeat(32)).parse().unwrap();

		assert!(matches!(client.get_votes_by_height(1).await, Err(Error::Response(_))));
		assert!(matches!(client.get_data_by_hash(&hash).await, Err(Error::Response(_))));
	}

	#[tokio::test]
	async fn send_parses_returned_hash() {
		let provider = MockProvider::new();
		provider.respond("icx_sendTransaction", json!(format!("0x{}", "ab".repeat(32))));
		let wallet = crate::signer::KeyWallet::create();
		let tx = TransactionBuilder::new()
			.from(*wallet.address())
			.to(SYSTEM_ADDRESS)
			.nid(3)
			.step_limit(1000)
			.build()
			.unwrap()
			.sign(&wallet)
			.unwrap();

		let hash = Client::new(provider.clone()).send_transaction(tx).await.unwrap();
		assert_eq!(hash.0, [0xab; 32]);

		let sent = provider.calls_to("icx_sendTransaction").remove(0).unwrap();
		assert!(sent.get("signature").is_some());
	}
}
