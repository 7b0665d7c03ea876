//! # CLI Interface
//!
//! Command-line argument structure for the `prism` demo binary, built
//! with `clap` derive. Two demo scenarios plus `version`.

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

/// PRISM Protocol demo runner.
///
/// Drives complete transaction lifecycles — composition, proving,
/// authorization, submission — against an in-memory local chain, and
/// narrates each step.
#[derive(Parser, Debug)]
#[command(
    name = "prism",
    about = "PRISM Protocol demo runner",
    version,
    propagate_version = true
)]
pub struct PrismCli {
    /// Log output format: "pretty" or "json".
    #[arg(long, env = "PRISM_LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the demo binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Custom-token lifecycle: deploy, token accounts, mint, and two
    /// callback-authorized transfers.
    TokenDemo(TokenDemoArgs),
    /// Block-height preconditions: assertions that survive when the
    /// chain holds still and void the transaction when it doesn't.
    LockupDemo,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `token-demo` subcommand.
#[derive(Parser, Debug)]
pub struct TokenDemoArgs {
    /// Units minted to the first holder.
    #[arg(long, default_value_t = 1_000_000)]
    pub mint_amount: u64,

    /// Units moved per callback-authorized transfer.
    #[arg(long, default_value_t = 1_000)]
    pub transfer_amount: u64,
}
