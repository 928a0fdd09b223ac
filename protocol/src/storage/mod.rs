//! # Storage Module
//!
//! Contract storage, and the machinery that lets one chain prove a word of
//! it to another.
//!
//! ## Architecture
//!
//! ```text
//! slots.rs  Slot keys, storage words, mapping slot derivation
//! state.rs  Per-contract storage and whole-chain state snapshots
//! proof.rs  Two-level Merkle storage proofs
//! chain.rs  Hash-linked headers committing to snapshot state roots
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! Contract writes → ContractStorage → StateSnapshot → Chain::seal → BlockHeader
//!                                          ↓                            ↓
//!                                    StorageProof  ──── verified against state_root
//! ```
//!
//! BLAKE3 for every tree node, SHA-256 only for mapping slots. Same split
//! as the rest of the protocol crate.

pub mod chain;
pub mod proof;
pub mod slots;
pub mod state;

pub use chain::{BlockHeader, Chain};
pub use proof::{ProofError, StorageProof};
pub use slots::{mapping_slot, SlotKey, StorageValue, EMPTY_WORD};
pub use state::{ContractStorage, StateSnapshot};
