//! # crossmint Contracts
//!
//! The two halves of a cross-chain collateralized mint, and everything they
//! lean on:
//!
//! - **Vault**: home chain. Takes yield-bearing collateral, prices it,
//!   authorizes mints, releases collateral against proven burns.
//! - **Facilitator**: target chain. Mints the stable asset against proven
//!   authorizations, burns it and commits the burn.
//! - **Verifiers**: `GiriGiriBashi` (header consensus + storage proofs) and
//!   an Ed25519 attestation committee, behind one trait.
//! - **Oracle, tokens**: the price table, the collateral adapter and the
//!   stable asset.
//!
//! ## Design Principles
//!
//! 1. The two contracts never call each other. Every fact crosses chains as
//!    a storage word plus a proof, and is consumed at most once.
//! 2. All monetary arithmetic is checked and rounds down, once.
//! 3. Validate, then write, then move tokens. A failed transfer undoes the
//!    writes before the error leaves the call.
//! 4. Every error maps to an [`ErrorKind`](crossmint_protocol::ErrorKind),
//!    so a relayer can tell "retry later" from "never again".

pub mod binding;
pub mod commitment;
pub mod facilitator;
pub mod oracle;
pub mod stable_asset;
pub mod token;
pub mod vault;
pub mod verifier;

pub use commitment::{BurnCommitment, MintAuthorization};
pub use facilitator::{Facilitator, FacilitatorError, FacilitatorEvent, FacilitatorParams};
pub use oracle::{PriceOracle, PriceSource};
pub use stable_asset::StableAsset;
pub use token::{CollateralToken, YieldBearingToken};
pub use vault::{CollateralPosition, Vault, VaultError, VaultEvent, VaultParams};
pub use verifier::{AttestationVerifier, CommitmentProof, CommitmentVerifier, GiriGiriBashi};
