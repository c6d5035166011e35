use thiserror::Error;

/// Failures raised by the library layer.
///
/// Everything up to `Missing` is detected locally, before any request
/// leaves the process.
#[derive(Debug, Error)]
pub enum Error {
	#[error("invalid address: {0}")]
	InvalidAddress(String),

	#[error("invalid number: {0}")]
	InvalidNumber(String),

	#[error("invalid hash: {0}")]
	InvalidHash(String),

	#[error("invalid {kind}: {value}")]
	InvalidArgument { kind: &'static str, value: String },

	#[error("{0} is required")]
	Missing(&'static str),

	#[error("keystore: {0}")]
	Keystore(String),

	#[error("JSON-RPC error {code}: {message}")]
	Rpc { code: i64, message: String },

	#[error("unexpected response: {0}")]
	Response(String),

	#[error(transparent)]
	Http(#[from] reqwest::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Archive(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
	pub(crate) fn invalid(kind: &'static str, value: impl Into<String>) -> Self {
		Self::InvalidArgument {
			kind,
			value: value.into(),
		}
	}
}
