//! # Hashing Utilities
//!
//! Two hash functions, each with a job:
//!
//! - **BLAKE3**: commitment digests, Merkle trees, block headers, address
//!   derivation. Everything crossmint-native.
//!
//! - **SHA-256**: mapping slot derivation. Storage locations follow the
//!   EVM `hash(key . slot)` construction, and an EVM-shaped layout is easier
//!   to reason about when the same layout is mirrored on a real chain.
//!
//! ## Merkle trees
//!
//! Leaves and inner nodes are hashed under different prefixes (`0x00` and
//! `0x01`), so a 64-byte leaf can never be passed off as an inner node. Odd
//! levels duplicate their last node. A single leaf is paired with itself so
//! the root is always the output of a node hash.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Prefix for Merkle leaf hashes.
const LEAF_PREFIX: [u8; 1] = [0x00];

/// Prefix for Merkle inner-node hashes.
const NODE_PREFIX: [u8; 1] = [0x01];

/// Compute the SHA-256 hash of the input data as a fixed-size array.
///
/// # Example
///
/// ```
/// use crossmint_protocol::crypto::hash::sha256;
///
/// let hash = sha256(b"crossmint");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute the BLAKE3 hash of the input data.
///
/// # Example
///
/// ```
/// use crossmint_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"crossmint");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hash multiple byte slices together without concatenating them first.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Compute a domain-separated hash using BLAKE3's `derive_key` mode.
///
/// `domain_separated_hash("a", x)` and `domain_separated_hash("b", x)` never
/// collide, because the context string selects a different internal IV.
/// Every commitment digest in the protocol goes through here with its own
/// domain tag from [`crate::config`].
pub fn domain_separated_hash(context: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Hash raw leaf data into a Merkle leaf.
pub fn merkle_leaf(data: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&LEAF_PREFIX);
    for part in data {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Hash two child nodes into their parent.
fn merkle_node(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    blake3_hash_multi(&[&NODE_PREFIX, left.as_slice(), right.as_slice()])
}

/// Compute the parent level of a Merkle level, duplicating an odd last node.
fn next_level(level: &[[u8; 32]]) -> Vec<[u8; 32]> {
    level
        .chunks(2)
        .map(|chunk| {
            let right = if chunk.len() == 2 { &chunk[1] } else { &chunk[0] };
            merkle_node(&chunk[0], right)
        })
        .collect()
}

/// Compute a Merkle root from a list of leaf hashes.
///
/// Returns all zeros for an empty list (the "empty tree" sentinel).
pub fn merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }
    if leaves.len() == 1 {
        return merkle_node(&leaves[0], &leaves[0]);
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// An inclusion proof for one leaf of a Merkle tree built by [`merkle_root`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Position of the leaf in the tree.
    pub index: u64,
    /// Sibling hashes from the leaf level up to (excluding) the root.
    pub siblings: Vec<[u8; 32]>,
}

impl MerkleProof {
    /// Returns `true` if `leaf` at `self.index` hashes up to `root`.
    pub fn verify(&self, leaf: &[u8; 32], root: &[u8; 32]) -> bool {
        if self.siblings.is_empty() {
            return false;
        }
        let mut hash = *leaf;
        let mut index = self.index;
        for sibling in &self.siblings {
            hash = if index % 2 == 0 {
                merkle_node(&hash, sibling)
            } else {
                merkle_node(sibling, &hash)
            };
            index /= 2;
        }
        // Leftover index bits mean the proof claimed a position deeper than
        // the tree it was checked against.
        index == 0 && &hash == root
    }
}

/// Build an inclusion proof for `leaves[index]`.
///
/// Returns `None` when `index` is out of range.
pub fn merkle_proof(leaves: &[[u8; 32]], index: usize) -> Option<MerkleProof> {
    if index >= leaves.len() {
        return None;
    }
    if leaves.len() == 1 {
        return Some(MerkleProof {
            index: 0,
            siblings: vec![leaves[0]],
        });
    }

    let mut siblings = Vec::new();
    let mut level = leaves.to_vec();
    let mut position = index;
    while level.len() > 1 {
        let sibling = if position % 2 == 0 {
            *level.get(position + 1).unwrap_or(&level[position])
        } else {
            level[position - 1]
        };
        siblings.push(sibling);
        level = next_level(&level);
        position /= 2;
    }

    Some(MerkleProof {
        index: index as u64,
        siblings,
    })
}
