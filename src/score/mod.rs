pub mod governance;
pub mod system;

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use serde_json::Value;

use crate::address::Address;
use crate::error::{Error, Result};
use crate::rpc::Client;
use crate::signer::Signer;
use crate::tx_builder::{Transaction, TransactionBuilder};
use crate::workflow::{Confirm, Mode, Outcome, TxHandler};

/// Read-only calls against one SCORE.
pub struct ScoreReader<'a> {
	client: &'a Client,
	address: Address,
}

impl<'a> ScoreReader<'a> {
	pub fn new(client: &'a Client, address: Address) -> Self {
		Self { client, address }
	}

	pub async fn query(&self, method: &str, params: Option<Value>) -> Result<Value> {
		self.client.call(&self.address, method, params).await
	}
}

/// Everything a write needs: who signs, for which network, and how the
/// operator approves it.
pub struct Invoker<'a> {
	client: &'a Client,
	signer: &'a dyn Signer,
	confirm: Box<dyn Confirm + 'a>,
	nid: u64,
	step_limit: u128,
	step_margin: f64,
	mode: Mode,
}

impl<'a> Invoker<'a> {
	pub fn new(
		client: &'a Client,
		signer: &'a dyn Signer,
		nid: u64,
		confirm: Box<dyn Confirm + 'a>,
	) -> Self {
		Self {
			client,
			signer,
			confirm,
			nid,
			step_limit: 0,
			step_margin: 1.0,
			mode: Mode::Send,
		}
	}

	/// Zero means "estimate first".
	pub fn step_limit(mut self, step_limit: u128) -> Self {
		self.step_limit = step_limit;
		self
	}

	pub fn step_margin(mut self, step_margin: f64) -> Self {
		self.step_margin = step_margin;
		self
	}

	pub fn mode(mut self, mode: Mode) -> Self {
		self.mode = mode;
		self
	}

	fn builder(&self, to: &Address) -> TransactionBuilder {
		TransactionBuilder::new()
			.from(*self.signer.address())
			.to(*to)
			.nid(self.nid)
			.step_limit(self.step_limit)
	}

	pub async fn invoke(
		&mut self,
		to: &Address,
		method: &str,
		params: Option<Value>,
	) -> Result<Outcome> {
		let tx = self.builder(to).call(method, params).build()?;
		self.run(tx).await
	}

	/// Plain ICX transfer, amount in loop.
	pub async fn transfer(&mut self, to: &Address, value: u128) -> Result<Outcome> {
		let tx = self.builder(to).value(value).build()?;
		self.run(tx).await
	}

	pub async fn deploy(
		&mut self,
		to: &Address,
		package: Package,
		params: Option<Value>,
	) -> Result<Outcome> {
		let tx = self
			.builder(to)
			.deploy(package.content_type, package.content, params)
			.build()?;
		self.run(tx).await
	}

	async fn run(&mut self, tx: Transaction) -> Result<Outcome> {
		TxHandler::new(self.client, self.step_margin)
			.run(tx, self.signer, self.confirm.as_mut(), self.mode)
			.await
	}
}

// -- Deploy content --

/// SCORE code ready to be embedded in a deploy transaction.
#[derive(Debug)]
pub struct Package {
	pub content_type: &'static str,
	pub content: Vec<u8>,
}

impl Package {
	/// Load a prepared `.zip`/`.jar`, or zip a project directory in memory.
	pub fn from_path(path: &Path) -> Result<Self> {
		if path.is_dir() {
			return Self::zip_dir(path);
		}

		let content_type = match path.extension().and_then(|e| e.to_str()) {
			Some("zip") => "application/zip",
			Some("jar") => "application/java",
			_ => return Err(Error::invalid("score path", path.display().to_string())),
		};
		Ok(Self {
			content_type,
			content: fs::read(path)?,
		})
	}

	/// Entries are stored under the directory's own name. Hidden files and
	/// `__pycache__` are left out.
	fn zip_dir(dir: &Path) -> Result<Self> {
		if !dir.join("package.json").is_file() {
			return Err(Error::invalid("score path", dir.display().to_string()));
		}
		let root = dir
			.canonicalize()?
			.file_name()
			.and_then(|n| n.to_str())
			.map(str::to_owned)
			.ok_or_else(|| Error::invalid("score path", dir.display().to_string()))?;

		let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
		add_dir(&mut writer, dir, &root)?;
		let content = writer.finish()?.into_inner();

		Ok(Self {
			content_type: "application/zip",
			content,
		})
	}
}

fn add_dir(writer: &mut zip::ZipWriter<Cursor<Vec<u8>>>, dir: &Path, prefix: &str) -> Result<()> {
	let options = zip::write::FileOptions::default()
		.compression_method(zip::CompressionMethod::Deflated);

	let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
	entries.sort_by_key(|e| e.file_name());

	for entry in entries {
		let name = entry.file_name().to_string_lossy().into_owned();
		if name.starts_with('.') || name == "__pycache__" {
			continue;
		}
		let path = entry.path();
		let entry_name = format!("{prefix}/{name}");
		if path.is_dir() {
			add_dir(writer, &path, &entry_name)?;
		} else {
			writer.start_file(entry_name, options)?;
			writer.write_all(&fs::read(&path)?)?;
		}
	}
	Ok(())
}
