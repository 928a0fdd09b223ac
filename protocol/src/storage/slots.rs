//! Storage slot addressing.
//!
//! A contract's storage is a map from 32-byte slot keys to 32-byte words.
//! Plain variables sit at small integer slots; a mapping declared at slot
//! `p` stores the entry for key `k` at `SHA-256(k || be32(p))`, the same
//! shape as the EVM's `keccak256(k . p)`. Both chains derive the location
//! of a commitment from nothing but the mapping position and the key, so a
//! verifier never needs to trust a prover about *where* to look.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::crypto::hash::sha256;

/// A 32-byte storage word.
pub type StorageValue = [u8; 32];

/// The all-zero word. Reading an unwritten slot yields this.
pub const EMPTY_WORD: StorageValue = [0u8; 32];

/// A 32-byte storage location.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SlotKey(pub [u8; 32]);

impl SlotKey {
    /// The slot of a plain variable at position `index`.
    pub fn from_index(index: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&index.to_be_bytes());
        Self(bytes)
    }

    /// Hex encoding with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotKey({}...)", &self.to_hex()[..14])
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for SlotKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SlotKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::custom("slot key must be 32 bytes"))?;
        Ok(SlotKey(arr))
    }
}

/// Location of `mapping[key]` for a mapping declared at position `base`.
pub fn mapping_slot(base: u64, key: &[u8]) -> SlotKey {
    let mut preimage = Vec::with_capacity(key.len() + 32);
    preimage.extend_from_slice(key);
    preimage.extend_from_slice(&SlotKey::from_index(base).0);
    SlotKey(sha256(&preimage))
}
