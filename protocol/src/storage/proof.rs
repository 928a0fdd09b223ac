//! # Storage Proofs
//!
//! A [`StorageProof`] convinces anyone holding a trusted state root that a
//! given contract's storage held a given word at a given slot. It is two
//! Merkle inclusion proofs stacked on each other: slot → storage root, and
//! storage root → state root.
//!
//! Verification recomputes both levels from the claimed `(account, slot,
//! value)`. Change any byte of the claim and the recomputed root moves.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::slots::{SlotKey, StorageValue};
use super::state::{account_leaf, storage_leaf};
use crate::crypto::hash::MerkleProof;
use crate::types::Address;

/// Errors from building, encoding or checking a storage proof.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProofError {
    /// The snapshot has no storage for this contract.
    #[error("account {0} not present in state")]
    AccountNotFound(Address),

    /// The contract never wrote this slot (or wrote the empty word).
    #[error("slot {slot} of {account} is empty")]
    SlotNotFound {
        /// Contract whose storage was queried.
        account: Address,
        /// The empty slot.
        slot: SlotKey,
    },

    /// The block's snapshot was never recorded or has been pruned.
    #[error("no state available for block {0}")]
    UnknownBlock(u64),

    /// The slot proof does not hash up to the claimed storage root.
    #[error("storage proof does not match storage root")]
    InvalidStorageProof,

    /// The account proof does not hash up to the state root.
    #[error("account proof does not match state root")]
    InvalidAccountProof,

    /// The proof bytes could not be decoded.
    #[error("proof encoding error: {0}")]
    Encoding(String),
}

/// Proof that `account`'s storage held `value` at `slot` in block
/// `block_number`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageProof {
    /// Block whose state root the proof is anchored to.
    pub block_number: u64,
    /// Contract whose storage is proven.
    pub account: Address,
    /// Proven slot.
    pub slot: SlotKey,
    /// Word held at `slot`.
    pub value: StorageValue,
    /// Root of `account`'s storage at that block.
    pub storage_root: [u8; 32],
    /// Inclusion of `(account, storage_root)` in the state root.
    pub account_proof: MerkleProof,
    /// Inclusion of `(slot, value)` in the storage root.
    pub storage_proof: MerkleProof,
}

impl StorageProof {
    /// Check the proof against a trusted state root and return the proven
    /// word.
    pub fn verify(&self, state_root: &[u8; 32]) -> Result<StorageValue, ProofError> {
        let slot_leaf = storage_leaf(&self.slot, &self.value);
        if !self.storage_proof.verify(&slot_leaf, &self.storage_root) {
            return Err(ProofError::InvalidStorageProof);
        }

        let account = account_leaf(&self.account, &self.storage_root);
        if !self.account_proof.verify(&account, state_root) {
            return Err(ProofError::InvalidAccountProof);
        }

        Ok(self.value)
    }

    /// Compact binary encoding for transport between relayer and contract.
    pub fn encode(&self) -> Result<Vec<u8>, ProofError> {
        bincode::serialize(self).map_err(|e| ProofError::Encoding(e.to_string()))
    }

    /// Decode a proof produced by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self, ProofError> {
        bincode::deserialize(bytes).map_err(|e| ProofError::Encoding(e.to_string()))
    }
}
