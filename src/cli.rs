use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::address::Address;
use crate::tx_builder::TxHash;
use crate::units;

#[derive(Parser, Debug)]
#[command(
	name = "governor",
	about = "Administration CLI for the governance and system SCOREs on ICON networks.",
	version
)]
pub struct Cli {
	#[command(flatten)]
	pub common: CommonArgs,

	#[command(subcommand)]
	pub command: Command,
}

/// Flags every command accepts.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
	/// Node URL or predefined network name [env: GOV_URL].
	#[arg(short = 'u', long, global = true)]
	pub url: Option<String>,

	/// Network id [env: GOV_NID].
	#[arg(short = 'n', long, global = true, value_parser = parse_u64)]
	pub nid: Option<u64>,

	/// Print the resolved arguments and every JSON-RPC request/response.
	#[arg(short = 'v', long, global = true)]
	pub verbose: bool,

	/// Write governor.log at this level (debug, info, warn, error, fatal).
	#[arg(long, global = true, value_name = "LEVEL")]
	pub log: Option<String>,
}

/// Flags shared by every command that signs a transaction.
#[derive(Args, Clone, Default)]
pub struct InvokeArgs {
	/// Keystore file path or private key in hex [env: GOV_KEY_STORE].
	#[arg(short = 'k', long)]
	pub keystore: Option<String>,

	/// Keystore password [env: GOV_PASSWORD].
	#[arg(short = 'p', long)]
	pub password: Option<String>,

	/// Step limit; 0 estimates it [env: GOV_STEP_LIMIT].
	#[arg(short = 's', long, value_parser = parse_u128)]
	pub step_limit: Option<u128>,

	/// Do not wait for the transaction result.
	#[arg(long)]
	pub no_result: bool,

	/// Send without asking for confirmation.
	#[arg(short = 'y', long)]
	pub yes: bool,

	/// Only estimate the steps the transaction would use.
	#[arg(long)]
	pub estimate: bool,
}

impl fmt::Debug for InvokeArgs {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InvokeArgs")
			.field("keystore", &self.keystore)
			.field("password", &self.password.as_ref().map(|_| "***"))
			.field("step_limit", &self.step_limit)
			.field("no_result", &self.no_result)
			.field("yes", &self.yes)
			.field("estimate", &self.estimate)
			.finish()
	}
}

/// An address given directly or taken from a keystore file.
#[derive(Args, Debug, Clone, Default)]
pub struct AccountArg {
	/// Account address.
	pub address: Option<Address>,

	/// Read the address from this keystore file instead.
	#[arg(short = 'k', long)]
	pub keystore: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	// -- Node queries --
	/// debug_getAccount
	#[command(name = "account")]
	Account(AccountCmd),
	/// icx_getBalance
	#[command(name = "balance")]
	Balance(BalanceCmd),
	/// icx_getBlockByHash, icx_getBlockByHeight and icx_getLastBlock
	#[command(name = "block")]
	Block(BlockCmd),
	/// icx_getTransactionByHash
	#[command(name = "tx")]
	Tx(TxCmd),
	/// icx_getTransactionResult
	#[command(name = "txresult")]
	TxResult(TxResultCmd),
	/// icx_getScoreApi
	#[command(name = "scoreApi")]
	ScoreApi(ScoreApiCmd),
	/// ise_getStatus
	#[command(name = "status")]
	Status(StatusCmd),
	/// icx_getDataByHash
	#[command(name = "dataByHash")]
	DataByHash(DataByHashCmd),
	/// icx_getBlockHeaderByHeight
	#[command(name = "blockHeaderByHeight", visible_alias = "blockHeaderByHash")]
	BlockHeaderByHeight(BlockHeaderByHeightCmd),
	/// icx_getVotesByHeight
	#[command(name = "votesByHeight")]
	VotesByHeight(VotesByHeightCmd),

	// -- Governance queries --
	/// getVersion of the governance SCORE
	#[command(name = "version")]
	Version(VersionCmd),
	/// getRevision
	#[command(name = "revision")]
	Revision(RevisionCmd),
	/// getServiceConfig
	#[command(name = "serviceConfig")]
	ServiceConfig(ServiceConfigCmd),
	/// getScoreStatus
	#[command(name = "scoreStatus")]
	ScoreStatus(ScoreStatusCmd),
	/// getStepPrice
	#[command(name = "stepPrice")]
	StepPrice(StepPriceCmd),
	/// getStepCosts
	#[command(name = "stepCosts")]
	StepCosts(StepCostsCmd),
	/// getMaxStepLimit
	#[command(name = "maxStepLimit")]
	MaxStepLimit(MaxStepLimitCmd),
	/// isDeployer
	#[command(name = "isDeployer")]
	IsDeployer(IsDeployerCmd),
	/// isInScoreBlackList
	#[command(name = "inScoreBlackList")]
	InScoreBlackList(InScoreBlackListCmd),
	/// isInImportWhiteList
	#[command(name = "inImportWhiteList")]
	InImportWhiteList(InImportWhiteListCmd),
	/// isAuditor
	#[command(name = "isAuditor")]
	IsAuditor(IsAuditorCmd),

	// -- System queries --
	/// getStake
	#[command(name = "stake")]
	Stake(StakeCmd),
	/// getDelegation
	#[command(name = "delegation")]
	Delegation(DelegationCmd),
	/// getPRep
	#[command(name = "prep")]
	PRep(PRepCmd),
	/// getPReps
	#[command(name = "preps")]
	PReps(PRepsCmd),
	/// getPRepStats
	#[command(name = "prepStats")]
	PRepStats(PRepStatsCmd),
	/// queryIScore
	#[command(name = "iscore")]
	IScore(IScoreCmd),
	/// getBonderList
	#[command(name = "bonderList")]
	BonderList(BonderListCmd),

	// -- Wallet --
	/// Show the address and keys of a keystore or private key
	#[command(name = "wallet")]
	Wallet(WalletCmd),
	/// Create a new keystore file
	#[command(name = "createWallet")]
	CreateWallet(CreateWalletCmd),

	// -- Governance writes --
	/// Deploy SCORE code (updates the governance SCORE by default)
	#[command(name = "deploy")]
	Deploy(DeployCmd),
	/// acceptScore
	#[command(name = "acceptScore")]
	AcceptScore(AcceptScoreCmd),
	/// rejectScore
	#[command(name = "rejectScore")]
	RejectScore(RejectScoreCmd),
	/// addAuditor
	#[command(name = "addAuditor")]
	AddAuditor(AddAuditorCmd),
	/// removeAuditor
	#[command(name = "removeAuditor")]
	RemoveAuditor(RemoveAuditorCmd),
	/// setRevision
	#[command(name = "setRevision")]
	SetRevision(SetRevisionCmd),
	/// setStepPrice
	#[command(name = "setStepPrice")]
	SetStepPrice(SetStepPriceCmd),
	/// setStepCost
	#[command(name = "setStepCost")]
	SetStepCost(SetStepCostCmd),
	/// setMaxStepLimit
	#[command(name = "setMaxStepLimit")]
	SetMaxStepLimit(SetMaxStepLimitCmd),
	/// addDeployer
	#[command(name = "addDeployer")]
	AddDeployer(AddDeployerCmd),
	/// removeDeployer
	#[command(name = "removeDeployer")]
	RemoveDeployer(RemoveDeployerCmd),
	/// addToScoreBlackList
	#[command(name = "addToScoreBlackList")]
	AddToScoreBlackList(AddToScoreBlackListCmd),
	/// removeFromScoreBlackList
	#[command(name = "removeFromScoreBlackList")]
	RemoveFromScoreBlackList(RemoveFromScoreBlackListCmd),
	/// addImportWhiteList
	#[command(name = "addImportWhiteList")]
	AddImportWhiteList(AddImportWhiteListCmd),
	/// removeImportWhiteList
	#[command(name = "removeImportWhiteList")]
	RemoveImportWhiteList(RemoveImportWhiteListCmd),
	/// updateServiceConfig
	#[command(name = "updateServiceConfig")]
	UpdateServiceConfig(UpdateServiceConfigCmd),

	// -- System writes --
	/// setStake
	#[command(name = "setStake")]
	SetStake(SetStakeCmd),
	/// setDelegation
	#[command(name = "setDelegation")]
	SetDelegation(SetDelegationCmd),
	/// claimIScore
	#[command(name = "claimIScore")]
	ClaimIScore(ClaimIScoreCmd),
	/// setBonderList
	#[command(name = "setBonderList")]
	SetBonderList(SetBonderListCmd),

	/// Send ICX
	#[command(name = "transfer")]
	Transfer(TransferCmd),
}

// -- Node query arguments --

#[derive(Args, Debug)]
pub struct AccountCmd {
	#[command(flatten)]
	pub account: AccountArg,

	/// 1 (coin), 2 (stake), 4 (delegation); combine by adding.
	#[arg(short = 'f', long, default_value_t = 7)]
	pub filter: u8,
}

#[derive(Args, Debug)]
pub struct BalanceCmd {
	#[command(flatten)]
	pub account: AccountArg,
}

#[derive(Args, Debug)]
pub struct BlockCmd {
	/// Block hash or height; the last block when omitted.
	pub value: Option<String>,
}

#[derive(Args, Debug)]
pub struct TxCmd {
	pub tx_hash: TxHash,
}

#[derive(Args, Debug)]
pub struct TxResultCmd {
	pub tx_hash: TxHash,
}

#[derive(Args, Debug)]
pub struct ScoreApiCmd {
	/// SCORE address; the governance SCORE when omitted.
	pub address: Option<Address>,
}

#[derive(Args, Debug)]
pub struct StatusCmd {
	/// Only return these fields, e.g. lastBlock.
	pub filter: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DataByHashCmd {
	pub data_hash: TxHash,
}

#[derive(Args, Debug)]
pub struct BlockHeaderByHeightCmd {
	#[arg(value_parser = parse_u64)]
	pub height: u64,
}

#[derive(Args, Debug)]
pub struct VotesByHeightCmd {
	#[arg(value_parser = parse_u64)]
	pub height: u64,
}

// -- Governance query arguments --

#[derive(Args, Debug)]
pub struct VersionCmd {}

#[derive(Args, Debug)]
pub struct RevisionCmd {}

#[derive(Args, Debug)]
pub struct ServiceConfigCmd {}

#[derive(Args, Debug)]
pub struct ScoreStatusCmd {
	pub address: Address,
}

#[derive(Args, Debug)]
pub struct StepPriceCmd {}

#[derive(Args, Debug)]
pub struct StepCostsCmd {}

#[derive(Args, Debug)]
pub struct MaxStepLimitCmd {
	/// invoke or query.
	#[arg(default_value = "invoke")]
	pub context_type: String,
}

#[derive(Args, Debug)]
pub struct IsDeployerCmd {
	pub address: Address,
}

#[derive(Args, Debug)]
pub struct InScoreBlackListCmd {
	pub address: Address,
}

#[derive(Args, Debug)]
pub struct InImportWhiteListCmd {
	/// Import statement, e.g. "{'os': ['path']}".
	pub import_stmt: String,
}

#[derive(Args, Debug)]
pub struct IsAuditorCmd {
	pub address: Address,
}

// -- System query arguments --

#[derive(Args, Debug)]
pub struct StakeCmd {
	#[command(flatten)]
	pub account: AccountArg,
}

#[derive(Args, Debug)]
pub struct DelegationCmd {
	#[command(flatten)]
	pub account: AccountArg,
}

#[derive(Args, Debug)]
pub struct PRepCmd {
	#[command(flatten)]
	pub account: AccountArg,
}

#[derive(Args, Debug)]
pub struct PRepsCmd {
	/// First ranking to return (1-based).
	#[arg(long, value_parser = parse_u64)]
	pub start: Option<u64>,

	/// Last ranking to return.
	#[arg(long, value_parser = parse_u64)]
	pub end: Option<u64>,
}

#[derive(Args, Debug)]
pub struct PRepStatsCmd {}

#[derive(Args, Debug)]
pub struct IScoreCmd {
	#[command(flatten)]
	pub account: AccountArg,
}

#[derive(Args, Debug)]
pub struct BonderListCmd {
	#[command(flatten)]
	pub account: AccountArg,
}

// -- Wallet arguments --

#[derive(Args)]
pub struct WalletCmd {
	/// Keystore file path or private key in hex.
	pub source: String,

	/// Keystore password [env: GOV_PASSWORD].
	#[arg(short = 'p', long)]
	pub password: Option<String>,
}

#[derive(Args)]
pub struct CreateWalletCmd {
	/// Where to write the new keystore.
	pub path: PathBuf,

	/// Keystore password [env: GOV_PASSWORD].
	#[arg(short = 'p', long)]
	pub password: Option<String>,
}

impl fmt::Debug for WalletCmd {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WalletCmd").field("source", &"***").finish()
	}
}

impl fmt::Debug for CreateWalletCmd {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CreateWalletCmd").field("path", &self.path).finish()
	}
}

// -- Governance write arguments --

#[derive(Args, Debug)]
pub struct DeployCmd {
	/// SCORE project directory, or a prepared .zip/.jar.
	pub path: PathBuf,

	/// Target SCORE; cx0000000000000000000000000000000000000000 installs.
	#[arg(long)]
	pub to: Option<Address>,

	/// Deploy parameters as a JSON object.
	#[arg(long)]
	pub params: Option<String>,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct AcceptScoreCmd {
	/// Hash of the deploy transaction.
	pub tx_hash: TxHash,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct RejectScoreCmd {
	/// Hash of the deploy transaction.
	pub tx_hash: TxHash,

	pub reason: String,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct AddAuditorCmd {
	pub address: Address,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct RemoveAuditorCmd {
	pub address: Address,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct SetRevisionCmd {
	#[arg(value_parser = parse_u128)]
	pub code: u128,

	/// Version name, e.g. 1.8.0.
	pub name: String,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct SetStepPriceCmd {
	/// Price in loop.
	#[arg(value_parser = parse_u128)]
	pub step_price: u128,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct SetStepCostCmd {
	/// One of default, contractCall, contractCreate, contractUpdate,
	/// contractDestruct, contractSet, get, set, replace, delete, input,
	/// eventlog, apiCall.
	pub step_type: String,

	#[arg(value_parser = parse_u128)]
	pub cost: u128,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct SetMaxStepLimitCmd {
	/// invoke or query.
	pub context_type: String,

	#[arg(value_parser = parse_u128)]
	pub value: u128,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct AddDeployerCmd {
	pub address: Address,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct RemoveDeployerCmd {
	pub address: Address,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct AddToScoreBlackListCmd {
	pub address: Address,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct RemoveFromScoreBlackListCmd {
	pub address: Address,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct AddImportWhiteListCmd {
	pub import_stmt: String,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct RemoveImportWhiteListCmd {
	pub import_stmt: String,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct UpdateServiceConfigCmd {
	#[arg(value_parser = parse_u128)]
	pub service_flag: u128,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

// -- System write arguments --

#[derive(Args, Debug)]
pub struct SetStakeCmd {
	/// Stake in loop.
	#[arg(value_parser = parse_u128)]
	pub value: u128,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct SetDelegationCmd {
	/// `address:loop` pairs; none clears every delegation.
	#[arg(value_parser = parse_delegation)]
	pub delegations: Vec<(Address, u128)>,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct ClaimIScoreCmd {
	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct SetBonderListCmd {
	/// Accounts allowed to bond to this P-Rep.
	pub bonders: Vec<Address>,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

#[derive(Args, Debug)]
pub struct TransferCmd {
	pub to: Address,

	/// Amount in ICX, or in loop with --loop.
	pub amount: String,

	/// Read the amount as loop.
	#[arg(long = "loop")]
	pub in_loop: bool,

	#[command(flatten)]
	pub invoke: InvokeArgs,
}

impl TransferCmd {
	/// The amount in loop.
	pub fn value(&self) -> Result<u128, crate::error::Error> {
		if self.in_loop {
			units::parse_int(&self.amount)
		} else {
			units::icx_to_loop(&self.amount)
		}
	}
}

// -- Value parsers --

fn parse_u64(s: &str) -> Result<u64, String> {
	let n = units::parse_int(s).map_err(|e| e.to_string())?;
	u64::try_from(n).map_err(|_| format!("{s} is out of range"))
}

fn parse_u128(s: &str) -> Result<u128, String> {
	units::parse_int(s).map_err(|e| e.to_string())
}

fn parse_delegation(s: &str) -> Result<(Address, u128), String> {
	let (address, value) = s
		.split_once(':')
		.ok_or_else(|| format!("expected address:value, got {s}"))?;
	let address = address.parse::<Address>().map_err(|e| e.to_string())?;
	Ok((address, parse_u128(value)?))
}
