use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::cli::{CommonArgs, InvokeArgs};
use crate::error::Error;
use crate::units;
use crate::workflow::PollPolicy;

/// Environment variables, passed in explicitly rather than read ad hoc.
pub type Env = HashMap<String, String>;

pub const ENV_URL: &str = "GOV_URL";
pub const ENV_NID: &str = "GOV_NID";
pub const ENV_KEY_STORE: &str = "GOV_KEY_STORE";
pub const ENV_PASSWORD: &str = "GOV_PASSWORD";
pub const ENV_STEP_LIMIT: &str = "GOV_STEP_LIMIT";

pub const DEFAULT_NETWORK: &str = "localnet";
pub const DEFAULT_URL: &str = "http://127.0.0.1:9000/api/v3";
pub const DEFAULT_NID: u64 = 3;

/// Built-in network names: (name, url, nid).
pub const PREDEFINED_NETWORKS: [(&str, &str, u64); 6] = [
	("mainnet", "https://ctz.solidwallet.io/api/v3", 1),
	("testnet", "https://test-ctz.solidwallet.io/api/v3", 2),
	("bicon", "https://bicon.net.solidwallet.io/api/v3", 3),
	("qanet", "https://eunsoo.net.solidwallet.io/api/v3", 80),
	("zicon", "https://zicon.net.solidwallet.io/api/v3", 1),
	("localnet", DEFAULT_URL, DEFAULT_NID),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEntry {
	pub url: String,
	pub nid: u64,
}

/// Contents of `~/.governor/config.toml`. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
	/// Multiplier applied to estimated step limits.
	pub step_margin: f64,
	pub poll_attempts: u32,
	/// Extra networks; a name shared with a built-in one overrides it.
	pub networks: BTreeMap<String, NetworkEntry>,
}

impl Default for FileConfig {
	fn default() -> Self {
		Self {
			step_margin: 1.0,
			poll_attempts: 3,
			networks: BTreeMap::new(),
		}
	}
}

impl FileConfig {
	/// Directory where CLI state is stored (~/.governor/).
	pub fn dir() -> Option<PathBuf> {
		dirs::home_dir().map(|home| home.join(".governor"))
	}

	pub fn path() -> Option<PathBuf> {
		Self::dir().map(|dir| dir.join("config.toml"))
	}

	/// Load the config file, falling back to defaults if there is none.
	pub fn load() -> anyhow::Result<Self> {
		match Self::path() {
			Some(path) if path.exists() => Self::load_from(&path),
			_ => Ok(Self::default()),
		}
	}

	pub fn load_from(path: &Path) -> anyhow::Result<Self> {
		let content = std::fs::read_to_string(path)?;
		Self::from_toml(&content).with_context(|| format!("invalid config file {}", path.display()))
	}

	pub fn from_toml(content: &str) -> anyhow::Result<Self> {
		let config: Self = toml::from_str(content)?;
		config.validate()?;
		Ok(config)
	}

	/// A margin below 1.0 would sign for fewer steps than the estimate.
	fn validate(&self) -> Result<(), Error> {
		if !self.step_margin.is_finite() || self.step_margin < 1.0 {
			return Err(Error::invalid("step_margin", self.step_margin.to_string()));
		}
		Ok(())
	}

	/// Look a network name up, file entries first.
	pub fn network(&self, name: &str) -> Option<NetworkEntry> {
		if let Some(entry) = self.networks.get(name) {
			return Some(entry.clone());
		}
		PREDEFINED_NETWORKS
			.iter()
			.find(|(n, _, _)| *n == name)
			.map(|(_, url, nid)| NetworkEntry {
				url: (*url).to_owned(),
				nid: *nid,
			})
	}

	/// Every known network, built-ins first.
	pub fn networks(&self) -> Vec<(String, NetworkEntry)> {
		PREDEFINED_NETWORKS
			.iter()
			.map(|(name, _, _)| (*name).to_owned())
			.chain(
				self.networks
					.keys()
					.filter(|k| !PREDEFINED_NETWORKS.iter().any(|(n, _, _)| *n == k.as_str()))
					.cloned(),
			)
			.filter_map(|name| self.network(&name).map(|entry| (name, entry)))
			.collect()
	}
}

// -- Resolved settings --

/// Connection settings every command needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
	pub url: String,
	/// `None` when neither a flag, the environment nor the network table
	/// says which chain to sign for.
	pub nid: Option<u64>,
	pub verbose: bool,
	pub step_margin: f64,
	pub poll_attempts: u32,
}

impl Settings {
	/// Resolve flag > environment > config file > default.
	pub fn resolve(args: &CommonArgs, env: &Env, file: &FileConfig) -> anyhow::Result<Self> {
		let target = args
			.url
			.clone()
			.or_else(|| env.get(ENV_URL).cloned())
			.unwrap_or_else(|| DEFAULT_NETWORK.to_owned());

		let (url, table_nid) = match file.network(&target) {
			Some(entry) => (entry.url, Some(entry.nid)),
			None => (target, None),
		};

		let nid = match args.nid {
			Some(nid) => Some(nid),
			None => match env.get(ENV_NID) {
				Some(raw) => Some(parse_nid(raw).with_context(|| format!("invalid {ENV_NID}"))?),
				None => table_nid.or((url == DEFAULT_URL).then_some(DEFAULT_NID)),
			},
		};

		Ok(Self {
			url,
			nid,
			verbose: args.verbose,
			step_margin: file.step_margin,
			poll_attempts: file.poll_attempts,
		})
	}

	pub fn require_nid(&self) -> Result<u64, Error> {
		self.nid.ok_or(Error::Missing("nid"))
	}

	pub fn poll_policy(&self) -> PollPolicy {
		PollPolicy {
			attempts: self.poll_attempts,
			..PollPolicy::default()
		}
	}
}

/// Extra settings for commands that sign.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeSettings {
	/// Keystore path or raw private key.
	pub keystore: String,
	pub password: Option<String>,
	/// Zero means "estimate".
	pub step_limit: u128,
}

impl InvokeSettings {
	pub fn resolve(args: &InvokeArgs, env: &Env) -> anyhow::Result<Self> {
		let keystore = args
			.keystore
			.clone()
			.or_else(|| env.get(ENV_KEY_STORE).cloned())
			.ok_or(Error::Missing("keystore"))?;

		let password = args
			.password
			.clone()
			.or_else(|| env.get(ENV_PASSWORD).cloned());

		let step_limit = match args.step_limit {
			Some(limit) => limit,
			None => match env.get(ENV_STEP_LIMIT) {
				Some(raw) => units::parse_int(raw).with_context(|| format!("invalid {ENV_STEP_LIMIT}"))?,
				None => 0,
			},
		};

		Ok(Self {
			keystore,
			password,
			step_limit,
		})
	}
}

fn parse_nid(raw: &str) -> Result<u64, Error> {
	let nid = units::parse_int(raw)?;
	u64::try_from(nid).map_err(|_| Error::InvalidNumber(raw.to_owned()))
}

// -- Logging and help --

/// Map a `--log` level name onto a filter. Unknown names mean `debug`.
pub fn log_level(name: &str) -> LevelFilter {
	match name.to_ascii_lowercase().as_str() {
		"info" => LevelFilter::Info,
		"warn" | "warning" => LevelFilter::Warn,
		"error" | "fatal" | "critical" => LevelFilter::Error,
		_ => LevelFilter::Debug,
	}
}

/// Help epilog listing the network table.
pub fn epilog(file: &FileConfig) -> String {
	let mut lines = vec!["predefined urls:".to_owned()];
	for (name, entry) in file.networks() {
		lines.push(format!("{:15}: {}", format!("{name}({})", entry.nid), entry.url));
	}
	lines.join("\n")
}
