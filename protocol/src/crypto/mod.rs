//! # Cryptographic Primitives
//!
//! Every commitment digest, every Merkle proof and every attestation
//! signature in crossmint flows through here.
//!
//! - **BLAKE3** for digests and Merkle trees.
//! - **SHA-256** for mapping slot derivation.
//! - **Ed25519** for storage attestation signatures. Header reporters
//!   are identified by caller address and sign nothing.
//!
//! Everything is a thin, type-safe wrapper around audited implementations.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, domain_separated_hash, merkle_root, sha256, MerkleProof};
pub use keys::{Keypair, PublicKey, Signature};
pub use signatures::{count_valid_signers, threshold_met};
