//! # Core Types
//!
//! Addresses, chain identifiers and the call context that every contract
//! operation receives.
//!
//! An [`Address`] is 20 bytes, the same width as an EVM account, so a
//! deployment description can be lifted straight from the chains the
//! contracts are meant to run on. Addresses serialize as `0x`-prefixed hex
//! strings, which lets them key JSON maps without a serde helper module.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::crypto::hash::blake3_hash;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account identifier (contract or externally owned).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address. Never a valid counterpart, recipient or minter.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Creates an address from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns `true` for [`Address::ZERO`].
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Derives a deterministic address from a label.
    ///
    /// `BLAKE3(label)` truncated to 20 bytes. Used by devnets and tests to
    /// name accounts ("alice", "vault@gnosis") without key management.
    pub fn derive(label: &str) -> Self {
        let hash = blake3_hash(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[..20]);
        Self(bytes)
    }

    /// Returns the `0x`-prefixed lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parses a hex address, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)?;
        if bytes.len() != 20 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..10])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// ChainId
// ---------------------------------------------------------------------------

/// Identifier of a chain, as reported by the chain itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Big-endian bytes, the canonical encoding inside digests.
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CallContext
// ---------------------------------------------------------------------------

/// The environment a contract operation executes in.
///
/// `caller` is the account that signed the transaction, `chain_id` is the
/// live id of the chain executing it, `block_number` the block it lands in.
/// Contracts compare `chain_id` against the id they recorded at deployment:
/// a contract running on the wrong chain is misconfigured, not unlucky.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// Transaction sender.
    pub caller: Address,
    /// Live chain id.
    pub chain_id: ChainId,
    /// Number of the block the call executes in.
    pub block_number: u64,
}

impl CallContext {
    /// Creates a context for `caller` on `chain_id` at `block_number`.
    pub fn new(caller: Address, chain_id: ChainId, block_number: u64) -> Self {
        Self {
            caller,
            chain_id,
            block_number,
        }
    }

    /// Same chain and block, different sender.
    pub fn with_caller(&self, caller: Address) -> Self {
        Self { caller, ..*self }
    }
}
