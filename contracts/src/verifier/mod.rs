//! # Commitment Verifiers
//!
//! The trust anchor. Every cross-chain guarantee crossmint makes reduces to
//! one question asked of a [`CommitmentVerifier`]: "did contract `account`
//! on chain `chain_id` hold word `expected` at slot `slot`?"
//!
//! Two backends answer it:
//!
//! | Backend              | Trusts                                   | Proof                       |
//! |----------------------|------------------------------------------|-----------------------------|
//! | [`GiriGiriBashi`]    | a threshold of header reporters          | Merkle storage proof        |
//! | [`AttestationVerifier`] | a threshold of Ed25519 attesters      | signatures over the word    |
//!
//! The Vault and the Facilitator hold an `Arc<dyn CommitmentVerifier>` and
//! never look inside the proof, so swapping one backend for the other
//! touches deployment wiring only.

pub mod attestation;
pub mod giri_giri_bashi;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crossmint_protocol::crypto::{PublicKey, Signature};
use crossmint_protocol::storage::{SlotKey, StorageProof, StorageValue};
use crossmint_protocol::{Address, ChainId, ErrorKind};

pub use attestation::{attestation_message, AttestationVerifier};
pub use giri_giri_bashi::GiriGiriBashi;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from proof verification and verifier administration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifierError {
    /// The verifier does not track this chain.
    #[error("unknown chain {0}")]
    UnknownChain(ChainId),

    /// No accepted header for the proof's block.
    #[error("no accepted header for block {number} of chain {chain}")]
    UnknownHeader {
        /// Proven chain.
        chain: ChainId,
        /// Block the proof is anchored to.
        number: u64,
    },

    /// The proof is older than the configured freshness bound.
    #[error("stale proof: block {block} is more than {max_age} blocks behind head {head}")]
    StaleProof {
        /// Block the proof is anchored to.
        block: u64,
        /// Newest accepted block of the proven chain.
        head: u64,
        /// Configured bound.
        max_age: u64,
    },

    /// The proof does not check out.
    #[error("invalid proof: {0}")]
    InvalidProof(String),

    /// The proof is valid but proves a different word.
    #[error("value mismatch: expected {}, found {}", hex::encode(.expected), hex::encode(.found))]
    ValueMismatch {
        /// Word the caller expected.
        expected: StorageValue,
        /// Word actually proven.
        found: StorageValue,
    },

    /// This backend does not understand the proof scheme.
    #[error("unsupported proof scheme")]
    UnsupportedProof,

    /// Fewer valid attester signatures than the threshold.
    #[error("insufficient attestations: {valid} valid, {threshold} required")]
    InsufficientAttestations {
        /// Distinct valid committee signatures.
        valid: usize,
        /// Required count.
        threshold: usize,
    },

    /// A reporter voted for a header that conflicts with an accepted one.
    #[error("conflicting header for block {number} of chain {chain}")]
    ConflictingHeader {
        /// Reported chain.
        chain: ChainId,
        /// Reported block.
        number: u64,
    },

    /// The caller lacks the role this operation requires.
    #[error("unauthorized: {caller}")]
    Unauthorized {
        /// Offending caller.
        caller: Address,
    },

    /// Threshold out of range for the current membership.
    #[error("invalid threshold {threshold} for {members} members")]
    InvalidThreshold {
        /// Rejected threshold.
        threshold: usize,
        /// Current number of reporters or attesters.
        members: usize,
    },
}

impl VerifierError {
    /// Coarse classification for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerifierError::UnknownChain(_)
            | VerifierError::UnsupportedProof
            | VerifierError::InvalidThreshold { .. } => ErrorKind::Configuration,
            VerifierError::UnknownHeader { .. }
            | VerifierError::StaleProof { .. }
            | VerifierError::InvalidProof(_)
            | VerifierError::ValueMismatch { .. }
            | VerifierError::InsufficientAttestations { .. } => ErrorKind::Verification,
            VerifierError::ConflictingHeader { .. } => ErrorKind::InvalidInput,
            VerifierError::Unauthorized { .. } => ErrorKind::Unauthorized,
        }
    }
}

// ---------------------------------------------------------------------------
// Proofs
// ---------------------------------------------------------------------------

/// Signed statement that a storage word existed at a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    /// Block the attesters observed.
    pub block_number: u64,
    /// Attested word.
    pub value: StorageValue,
    /// Committee signatures over [`attestation_message`].
    pub signatures: Vec<(PublicKey, Signature)>,
}

/// A proof in one of the supported schemes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentProof {
    /// Merkle storage proof against an accepted header.
    Storage(StorageProof),
    /// Threshold-signed attestation.
    Attestation(Attestation),
}

impl CommitmentProof {
    /// Block the proof is anchored to.
    pub fn block_number(&self) -> u64 {
        match self {
            CommitmentProof::Storage(p) => p.block_number,
            CommitmentProof::Attestation(a) => a.block_number,
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Cross-chain storage fact checker.
pub trait CommitmentVerifier: Send + Sync {
    /// Succeeds iff `proof` shows that `account` on `chain_id` held
    /// `expected` at `slot` in a sufficiently recent block.
    fn verify(
        &self,
        chain_id: ChainId,
        account: &Address,
        slot: &SlotKey,
        expected: &StorageValue,
        proof: &CommitmentProof,
    ) -> Result<(), VerifierError>;

    /// Called by a contract after the operation gated on `verify` has
    /// committed. `verify` never mutates; backends that learn the remote
    /// head from proofs advance it here. Proofs that do not verify are
    /// ignored.
    fn record_accepted(
        &self,
        _chain_id: ChainId,
        _account: &Address,
        _slot: &SlotKey,
        _expected: &StorageValue,
        _proof: &CommitmentProof,
    ) {
    }
}

/// `head - block <= max_age`, treating a block ahead of head as fresh.
pub(crate) fn check_freshness(block: u64, head: u64, max_age: u64) -> Result<(), VerifierError> {
    if head.saturating_sub(block) > max_age {
        return Err(VerifierError::StaleProof {
            block,
            head,
            max_age,
        });
    }
    Ok(())
}
