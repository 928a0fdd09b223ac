//! # Contract Storage & State Snapshots
//!
//! Each contract owns a [`ContractStorage`]: an ordered map of slot keys to
//! words. A chain's state at one block is a [`StateSnapshot`] of every
//! contract's storage. Two Merkle levels turn a snapshot into a single
//! state root:
//!
//! ```text
//! storage_root = merkle_root(sort([ leaf(slot || value) for each slot ]))
//! state_root   = merkle_root(sort([ leaf(address || storage_root) for each contract ]))
//! ```
//!
//! Sorting (BTreeMap order) makes both roots independent of write order,
//! so two honest observers of the same state always agree on the root.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::proof::{ProofError, StorageProof};
use super::slots::{SlotKey, StorageValue, EMPTY_WORD};
use crate::crypto::hash::{merkle_leaf, merkle_proof, merkle_root};
use crate::types::Address;

/// Merkle leaf for one storage slot.
pub fn storage_leaf(slot: &SlotKey, value: &StorageValue) -> [u8; 32] {
    merkle_leaf(&[&slot.0, value])
}

/// Merkle leaf for one contract account.
pub fn account_leaf(account: &Address, storage_root: &[u8; 32]) -> [u8; 32] {
    merkle_leaf(&[account.as_bytes(), storage_root])
}

// ---------------------------------------------------------------------------
// ContractStorage
// ---------------------------------------------------------------------------

/// The storage of a single contract.
///
/// Writing the empty word deletes the slot, so "never written" and "reset
/// to zero" are indistinguishable, exactly as on an EVM chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStorage {
    slots: BTreeMap<SlotKey, StorageValue>,
}

impl ContractStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a slot. Unwritten slots read as [`EMPTY_WORD`].
    pub fn load(&self, slot: &SlotKey) -> StorageValue {
        self.slots.get(slot).copied().unwrap_or(EMPTY_WORD)
    }

    /// Write a slot.
    pub fn store(&mut self, slot: SlotKey, value: StorageValue) {
        if value == EMPTY_WORD {
            self.slots.remove(&slot);
        } else {
            self.slots.insert(slot, value);
        }
    }

    /// Number of non-empty slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot holds a non-empty word.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn leaves(&self) -> Vec<[u8; 32]> {
        self.slots
            .iter()
            .map(|(slot, value)| storage_leaf(slot, value))
            .collect()
    }

    /// Merkle root over all non-empty slots. Empty storage → all zeros.
    pub fn storage_root(&self) -> [u8; 32] {
        merkle_root(&self.leaves())
    }
}

// ---------------------------------------------------------------------------
// StateSnapshot
// ---------------------------------------------------------------------------

/// The storage of every contract on a chain at one block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    accounts: BTreeMap<Address, ContractStorage>,
}

impl StateSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a contract's storage in the snapshot.
    pub fn insert(&mut self, account: Address, storage: ContractStorage) {
        self.accounts.insert(account, storage);
    }

    /// Storage of one contract, if present.
    pub fn get(&self, account: &Address) -> Option<&ContractStorage> {
        self.accounts.get(account)
    }

    fn account_leaves(&self) -> Vec<[u8; 32]> {
        self.accounts
            .iter()
            .map(|(account, storage)| account_leaf(account, &storage.storage_root()))
            .collect()
    }

    /// The state root committed in block headers.
    pub fn state_root(&self) -> [u8; 32] {
        merkle_root(&self.account_leaves())
    }

    /// Build an inclusion proof for `account.slot`.
    ///
    /// The returned proof carries `block_number = 0`; the chain that serves
    /// the proof stamps the real block number.
    pub fn prove(&self, account: &Address, slot: &SlotKey) -> Result<StorageProof, ProofError> {
        let account_index = self
            .accounts
            .keys()
            .position(|a| a == account)
            .ok_or(ProofError::AccountNotFound(*account))?;
        let storage = &self.accounts[account];

        let slot_index = storage
            .slots
            .keys()
            .position(|s| s == slot)
            .ok_or(ProofError::SlotNotFound {
                account: *account,
                slot: *slot,
            })?;

        let storage_proof =
            merkle_proof(&storage.leaves(), slot_index).ok_or(ProofError::InvalidStorageProof)?;
        let account_proof = merkle_proof(&self.account_leaves(), account_index)
            .ok_or(ProofError::InvalidAccountProof)?;

        Ok(StorageProof {
            block_number: 0,
            account: *account,
            slot: *slot,
            value: storage.load(slot),
            storage_root: storage.storage_root(),
            account_proof,
            storage_proof,
        })
    }
}
