//! Estimate, confirm, sign and send: the life of one write transaction.
//!
//! `Built -> Estimated? -> Confirmed -> Signed -> Submitted`, then the
//! caller may poll for the result.  Nothing moves backwards; a declined
//! transaction is simply dropped.

use std::io::{BufRead, Write};
use std::time::Duration;

use serde_json::Value;

use crate::error::Result;
use crate::output;
use crate::rpc::Client;
use crate::signer::Signer;
use crate::tx_builder::{Transaction, TxHash};

/// What a command ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
	/// A read finished and printed its result.
	Done,
	Submitted(TxHash),
	Estimated(u128),
	/// The operator answered "n"; nothing was sent.
	Declined,
}

// -- Confirmation --

/// Decides whether a transaction may be sent.
pub trait Confirm: Send {
	fn confirm(&mut self, request: &Value) -> Result<bool>;
}

/// `--yes`: show the request and go ahead.
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
	fn confirm(&mut self, request: &Value) -> Result<bool> {
		output::print_request(request);
		Ok(true)
	}
}

/// Interactive `[Y/n]` prompt. Only an explicit "n" declines; end of
/// input declines too.
pub struct PromptConfirm<R, W> {
	input: R,
	output: W,
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
	pub fn new(input: R, output: W) -> Self {
		Self { input, output }
	}
}

impl PromptConfirm<std::io::BufReader<std::io::Stdin>, std::io::Stdout> {
	pub fn stdio() -> Self {
		Self::new(std::io::BufReader::new(std::io::stdin()), std::io::stdout())
	}
}

impl<R: BufRead + Send, W: Write + Send> Confirm for PromptConfirm<R, W> {
	fn confirm(&mut self, request: &Value) -> Result<bool> {
		writeln!(self.output, "{}", output::title("Request"))?;
		writeln!(self.output, "{}\n", output::render(request))?;
		write!(self.output, "> Continue? [Y/n]")?;
		self.output.flush()?;

		let mut answer = String::new();
		if self.input.read_line(&mut answer)? == 0 {
			return Ok(false);
		}
		Ok(!answer.trim().eq_ignore_ascii_case("n"))
	}
}

// -- Transaction handler --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	/// Only ask the node for the step count.
	Estimate,
	Send,
}

pub struct TxHandler<'a> {
	client: &'a Client,
	step_margin: f64,
}

impl<'a> TxHandler<'a> {
	pub fn new(client: &'a Client, step_margin: f64) -> Self {
		Self {
			client,
			step_margin,
		}
	}

	pub async fn run(
		&self,
		tx: Transaction,
		signer: &dyn Signer,
		confirm: &mut dyn Confirm,
		mode: Mode,
	) -> Result<Outcome> {
		if mode == Mode::Estimate {
			log::debug!("estimate start: {:?}", tx.method());
			let steps = self.client.estimate_step(&tx).await?;
			log::debug!("estimate end: {steps}");
			return Ok(Outcome::Estimated(steps));
		}

		let tx = match tx.step_limit() {
			Some(_) => tx,
			None => {
				log::debug!("estimate start: {:?}", tx.method());
				let steps = self.client.estimate_step(&tx).await?;
				let limit = apply_margin(steps, self.step_margin);
				log::debug!("estimate end: {steps}, step limit {limit}");
				tx.with_step_limit(limit)
			}
		};

		if !confirm.confirm(&tx.to_json())? {
			log::debug!("declined: {:?}", tx.method());
			return Ok(Outcome::Declined);
		}

		log::debug!("sign start");
		let signed = tx.sign(signer)?;
		log::debug!("sign end: {}", signed.hash());

		log::debug!("send start");
		let hash = self.client.send_transaction(signed).await?;
		log::debug!("send end: {hash}");
		Ok(Outcome::Submitted(hash))
	}
}

/// Scale an estimate up by `margin`; margins at or below 1.0 leave it as is.
pub fn apply_margin(steps: u128, margin: f64) -> u128 {
	if !margin.is_finite() || margin <= 1.0 {
		return steps;
	}
	(steps as f64 * margin).ceil() as u128
}

// -- Result polling --

#[derive(Debug, Clone)]
pub struct PollPolicy {
	pub attempts: u32,
	pub initial_delay: Duration,
	pub retry_delay: Duration,
}

impl Default for PollPolicy {
	fn default() -> Self {
		Self {
			attempts: 3,
			initial_delay: Duration::from_secs(3),
			retry_delay: Duration::from_secs(2),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
	Resolved(Value),
	Exhausted,
}

/// Wait for a submitted transaction to land. Any failure, including
/// "not found yet", counts as retryable; running out of attempts is
/// reported, not raised.
pub async fn poll_result(client: &Client, hash: &TxHash, policy: &PollPolicy) -> PollOutcome {
	tokio::time::sleep(policy.initial_delay).await;

	for attempt in 1..=policy.attempts {
		log::debug!("poll {attempt}/{} for {hash}", policy.attempts);
		match client.get_transaction_result(hash).await {
			Ok(result) => return PollOutcome::Resolved(result),
			Err(e) => {
				log::debug!("poll {attempt} failed: {e}");
				if attempt < policy.attempts {
					println!(
						"Retrying {}/{} after {} seconds...",
						attempt + 1,
						policy.attempts,
						policy.retry_delay.as_secs()
					);
					tokio::time::sleep(policy.retry_delay).await;
				}
			}
		}
	}

	println!("Failed to get the transaction result: {hash}");
	PollOutcome::Exhausted
}
