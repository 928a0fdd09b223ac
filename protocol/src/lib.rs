// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # crossmint Protocol: Core Library
//!
//! The primitives underneath a two-chain collateralized mint: a Vault on the
//! home chain locks collateral and authorizes mints, a Facilitator on the
//! target chain mints and burns the stable asset, and neither can call the
//! other. Everything they know about each other arrives as a storage proof.
//!
//! This crate holds the parts both sides must agree on byte-for-byte:
//!
//! - **types**: Addresses, chain ids, the per-call transaction context.
//! - **crypto**: BLAKE3/SHA-256 hashing, Merkle proofs, Ed25519 keys.
//! - **storage**: Contract storage words, mapping slot derivation, state
//!   snapshots, storage proofs and the simulated chain that seals them.
//! - **error**: The error taxonomy every contract error maps into.
//! - **math**: Overflow-free `mul_div` for valuation and releases.
//! - **config**: Decimals, slot layout, domain tags and other constants.
//!
//! ## Design Philosophy
//!
//! 1. A commitment written on one chain must be reproducible bit-for-bit by
//!    the other. Encodings here are canonical and versioned by domain tag.
//! 2. Proof verification never trusts the prover's claimed value; it
//!    recomputes the root.
//! 3. If it touches money, it has tests. Plural.

pub mod config;
pub mod crypto;
pub mod error;
pub mod math;
pub mod storage;
pub mod types;

pub use error::ErrorKind;
pub use types::{Address, CallContext, ChainId};
