//! Error taxonomy shared by every crossmint contract.
//!
//! Each contract has its own `thiserror` enum with the details that matter
//! to it. Callers that only need to decide *what to do* about a failure
//! (retry with a fresher proof, drop the job, page someone) look at the
//! [`ErrorKind`] instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of a contract failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Counterpart unset, wrong chain, mismatched asset wiring. Blocks every
    /// mint and release path until an administrator fixes the deployment.
    Configuration,
    /// Caller lacks the role the operation requires.
    Unauthorized,
    /// Malformed arguments (zero amount, zero address, ratio out of range).
    InvalidInput,
    /// Balance or allowance too small. Nothing changed; caller may retry.
    InsufficientFunds,
    /// The oracle has no price for an asset. Blocks minting only.
    PriceUnavailable,
    /// A cross-chain proof did not verify or did not match. The fact stays
    /// unconsumed, so a corrected or fresher proof can be resubmitted.
    Verification,
    /// The fact was already consumed. Security-critical, never retried.
    Replay,
    /// Checked arithmetic overflowed.
    Arithmetic,
}

impl ErrorKind {
    /// Whether resubmitting the same operation later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Verification | ErrorKind::InsufficientFunds | ErrorKind::PriceUnavailable
        )
    }

    /// Stable lowercase label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::PriceUnavailable => "price_unavailable",
            ErrorKind::Verification => "verification",
            ErrorKind::Replay => "replay",
            ErrorKind::Arithmetic => "arithmetic",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
