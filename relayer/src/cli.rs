//! # CLI Interface
//!
//! `clap` derive definitions for `crossmint-relayer`: `run`, `simulate`,
//! `check-config` and `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Off-chain relay for the crossmint Vault and Facilitator.
///
/// Carries block headers, mint authorizations and burn commitments between
/// the home and target chains. The contracts verify everything it carries.
#[derive(Parser, Debug)]
#[command(
    name = "crossmint-relayer",
    about = "crossmint cross-chain relayer",
    version,
    propagate_version = true
)]
pub struct CrossmintRelayerCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Relay continuously and serve `/health`, `/status` and `/metrics`.
    Run(RunArgs),
    /// Drive one deposit → mint → burn → release round trip on a devnet.
    Simulate(SimulateArgs),
    /// Validate a config file and print the effective configuration.
    CheckConfig(CheckConfigArgs),
    /// Print version information and exit.
    Version,
}

/// Logging flags shared by every long-running subcommand.
#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    /// Log format: `pretty` or `json`.
    #[arg(long, env = "CROSSMINT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Filter directives used when `RUST_LOG` is unset.
    #[arg(long, env = "CROSSMINT_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the JSON relayer configuration. Defaults apply when omitted.
    #[arg(long, short = 'c', env = "CROSSMINT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides `metrics_port` from the config.
    #[arg(long, env = "CROSSMINT_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Overrides `poll_interval_ms` from the config.
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    #[command(flatten)]
    pub log: LogArgs,
}

/// Arguments for `simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Path to the JSON relayer configuration. Defaults apply when omitted.
    #[arg(long, short = 'c', env = "CROSSMINT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seed account (by label) that deposits and burns.
    #[arg(long, default_value = "alice")]
    pub account: String,

    /// Whole collateral tokens to deposit.
    #[arg(long, default_value_t = 100)]
    pub deposit: u64,

    #[command(flatten)]
    pub log: LogArgs,
}

/// Arguments for `check-config`.
#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Config file to validate.
    pub path: PathBuf,
}
