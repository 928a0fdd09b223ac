//! # Cross-Chain Commitments
//!
//! The two facts that cross between chains, and their canonical encoding.
//!
//! ```text
//! Vault (home)        writes  MintAuthorization.digest()  at mapping_slot(VAULT_AUTHORIZATIONS_SLOT, nonce)
//! Facilitator (target) writes BurnCommitment.digest()     at mapping_slot(FACILITATOR_BURNS_SLOT, nonce)
//! ```
//!
//! A digest is a domain-separated BLAKE3 hash over the big-endian encoding
//! of every field. The consuming side never reads the fact back out of the
//! slot: it rebuilds the digest from the arguments it was called with and
//! asks its verifier whether that exact word sits in the counterpart's
//! storage. One flipped bit in any field, and the words differ.

use serde::{Deserialize, Serialize};

use crossmint_protocol::config::{BURN_COMMITMENT_DOMAIN, MINT_AUTHORIZATION_DOMAIN};
use crossmint_protocol::crypto::domain_separated_hash;
use crossmint_protocol::storage::{mapping_slot, SlotKey, StorageValue};
use crossmint_protocol::{Address, ChainId};

/// Storage location of commitment `nonce` in a mapping declared at `base`.
pub fn commitment_slot(base: u64, nonce: u64) -> SlotKey {
    mapping_slot(base, &nonce.to_be_bytes())
}

/// An address left-padded to a full storage word.
pub fn address_word(address: &Address) -> StorageValue {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// "`recipient` may receive `amount` stable units", issued by the Vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintAuthorization {
    /// Monotonic per-Vault authorization counter.
    pub nonce: u64,
    /// Account credited on the target chain.
    pub recipient: Address,
    /// Stable units authorized.
    pub amount: u128,
    /// Chain the Vault lives on.
    pub source_chain: ChainId,
}

impl MintAuthorization {
    /// The storage word the Vault writes for this authorization.
    pub fn digest(&self) -> StorageValue {
        domain_separated_hash(
            MINT_AUTHORIZATION_DOMAIN,
            &[
                &self.nonce.to_be_bytes(),
                self.recipient.as_bytes(),
                &self.amount.to_be_bytes(),
                &self.source_chain.to_be_bytes(),
            ],
        )
    }
}

/// "`amount` stable units were burned to release `user`'s collateral",
/// recorded by the Facilitator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnCommitment {
    /// Monotonic per-Facilitator burn counter.
    pub nonce: u64,
    /// Account whose collateral is released on the home chain.
    pub user: Address,
    /// Collateral token the release draws from.
    pub collateral_asset: Address,
    /// Stable units burned.
    pub amount: u128,
    /// Chain the Facilitator lives on.
    pub source_chain: ChainId,
}

impl BurnCommitment {
    /// The storage word the Facilitator writes for this burn.
    pub fn digest(&self) -> StorageValue {
        domain_separated_hash(
            BURN_COMMITMENT_DOMAIN,
            &[
                &self.nonce.to_be_bytes(),
                self.user.as_bytes(),
                self.collateral_asset.as_bytes(),
                &self.amount.to_be_bytes(),
                &self.source_chain.to_be_bytes(),
            ],
        )
    }
}
