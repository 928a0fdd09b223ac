//! # Relayer Configuration
//!
//! A single JSON document describes both chains, the verifier committees
//! and the devnet seed state. Every field has a default, so `{}` is a valid
//! config that yields an Ethereum ↔ Gnosis devnet.
//!
//! ```json
//! {
//!   "home_chain_id": 1,
//!   "target_chain_id": 100,
//!   "mint_ratio_bps": 10000,
//!   "reporters": 3,
//!   "threshold": 2,
//!   "max_proof_age": 256,
//!   "poll_interval_ms": 2000,
//!   "max_attempts": 32,
//!   "metrics_port": 9752,
//!   "collateral_decimals": 18,
//!   "collateral_price": 250000000000,
//!   "stable_price": 100000000,
//!   "seed_accounts": { "alice": 1000 }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crossmint_protocol::config::{
    BPS_DENOMINATOR, CHAIN_ETHEREUM, CHAIN_GNOSIS, DEFAULT_HEADER_THRESHOLD,
    DEFAULT_MAX_PROOF_AGE, DEFAULT_MINT_RATIO_BPS, PRICE_UNIT,
};
use crossmint_protocol::ChainId;

/// Default port for the `/metrics` and `/status` endpoints.
pub const DEFAULT_METRICS_PORT: u16 = 9752;

/// Default number of submissions a queued fact gets before it is abandoned.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 32;

/// Rejected configuration values.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Chain id 0 is reserved.
    #[error("{0} chain id must be non-zero")]
    ZeroChainId(&'static str),

    /// Both sides on one chain is not a cross-chain deployment.
    #[error("home and target chain are both {0}")]
    SameChain(ChainId),

    /// Threshold outside `1..=reporters`.
    #[error("threshold {threshold} out of range for {reporters} reporters")]
    InvalidThreshold {
        /// Configured threshold.
        threshold: usize,
        /// Configured reporter count.
        reporters: usize,
    },

    /// Mint ratio outside `1..=10_000` bps.
    #[error("mint ratio {0} bps out of range")]
    InvalidMintRatio(u32),

    /// A price of zero would make every valuation meaningless.
    #[error("{0} price must be non-zero")]
    ZeroPrice(&'static str),

    /// A zero interval or proof age.
    #[error("{0} must be non-zero")]
    ZeroDuration(&'static str),

    /// A fact must be submitted at least once.
    #[error("max_attempts must be non-zero")]
    ZeroAttempts,
}

/// Complete relayer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayerConfig {
    /// Chain hosting the oracle, collateral and Vault.
    pub home_chain_id: ChainId,
    /// Chain hosting the stable asset and Facilitator.
    pub target_chain_id: ChainId,
    /// Vault mint ratio in basis points.
    pub mint_ratio_bps: u32,
    /// Header reporter keys per verifier.
    pub reporters: usize,
    /// Reporters that must agree before a header is accepted.
    pub threshold: usize,
    /// Oldest accepted proof, in blocks behind the verifier's head.
    pub max_proof_age: u64,
    /// Time between relay ticks in `run` mode.
    pub poll_interval_ms: u64,
    /// Submissions per queued fact before the relayer gives up on it.
    pub max_attempts: u32,
    /// Port for the HTTP endpoints in `run` mode.
    pub metrics_port: u16,
    /// Decimals of the devnet collateral token.
    pub collateral_decimals: u8,
    /// Collateral price in 8-decimal quote units.
    pub collateral_price: u64,
    /// Stable asset price in 8-decimal quote units.
    pub stable_price: u64,
    /// Devnet accounts (by label) and their starting collateral, in whole
    /// tokens.
    pub seed_accounts: BTreeMap<String, u64>,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            home_chain_id: CHAIN_ETHEREUM,
            target_chain_id: CHAIN_GNOSIS,
            mint_ratio_bps: DEFAULT_MINT_RATIO_BPS,
            reporters: 3,
            threshold: DEFAULT_HEADER_THRESHOLD,
            max_proof_age: DEFAULT_MAX_PROOF_AGE,
            poll_interval_ms: 2_000,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            metrics_port: DEFAULT_METRICS_PORT,
            collateral_decimals: 18,
            collateral_price: 2_500 * PRICE_UNIT as u64,
            stable_price: PRICE_UNIT as u64,
            seed_accounts: BTreeMap::from([("alice".to_string(), 1_000)]),
        }
    }
}

impl RelayerConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if given, otherwise the validated defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Check every cross-field constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.home_chain_id.0 == 0 {
            return Err(ConfigError::ZeroChainId("home"));
        }
        if self.target_chain_id.0 == 0 {
            return Err(ConfigError::ZeroChainId("target"));
        }
        if self.home_chain_id == self.target_chain_id {
            return Err(ConfigError::SameChain(self.home_chain_id));
        }
        if self.threshold == 0 || self.threshold > self.reporters {
            return Err(ConfigError::InvalidThreshold {
                threshold: self.threshold,
                reporters: self.reporters,
            });
        }
        if self.mint_ratio_bps == 0 || u128::from(self.mint_ratio_bps) > BPS_DENOMINATOR {
            return Err(ConfigError::InvalidMintRatio(self.mint_ratio_bps));
        }
        if self.collateral_price == 0 {
            return Err(ConfigError::ZeroPrice("collateral"));
        }
        if self.stable_price == 0 {
            return Err(ConfigError::ZeroPrice("stable"));
        }
        if self.max_proof_age == 0 {
            return Err(ConfigError::ZeroDuration("max_proof_age"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("poll_interval_ms"));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }
}
