use std::fs::File;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches};

use governor_cli::cli::Cli;
use governor_cli::commands::{self, Context};
use governor_cli::config::{self, Env, FileConfig, Settings};
use governor_cli::output;

const LOG_FILE: &str = "governor.log";

#[tokio::main]
async fn main() -> ExitCode {
	match run().await {
		Ok(code) => ExitCode::from(code),
		Err(e) => {
			log::error!("{e:#}");
			eprintln!("Error: {e:#}");
			ExitCode::FAILURE
		}
	}
}

async fn run() -> Result<u8> {
	let file = FileConfig::load()?;
	let matches = Cli::command().after_help(config::epilog(&file)).get_matches();
	let cli = Cli::from_arg_matches(&matches)?;

	init_logging(cli.common.log.as_deref())?;

	let env: Env = std::env::vars().collect();
	let settings = Settings::resolve(&cli.common, &env, &file)?;
	if settings.verbose {
		output::print_title("Arguments");
		println!("{settings:#?}\n{:#?}\n", cli.command);
	}
	log::debug!("url={} nid={:?}", settings.url, settings.nid);

	let ctx = Context::new(settings, env)?;
	commands::run(cli.command.as_command(), &ctx).await
}

/// `--log LEVEL` writes governor.log in the working directory; otherwise
/// RUST_LOG applies, warnings by default.
fn init_logging(level: Option<&str>) -> Result<()> {
	match level {
		Some(level) => {
			let file = File::create(LOG_FILE)?;
			env_logger::Builder::new()
				.filter_level(config::log_level(level))
				.target(env_logger::Target::Pipe(Box::new(file)))
				.init();
		}
		None => {
			env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
		}
	}
	Ok(())
}
