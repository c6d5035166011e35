pub mod address;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod rpc;
pub mod score;
pub mod shapes;
pub mod signer;
pub mod tx_builder;
pub mod units;
pub mod workflow;
