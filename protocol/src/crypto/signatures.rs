//! # Threshold Signature Checks
//!
//! Cross-chain facts are accepted when enough independent signers vouch for
//! them. This module counts how many *distinct, known* signers produced a
//! valid signature over one message. It never says which signature failed:
//! a detailed error oracle helps nobody but an attacker.

use std::collections::BTreeSet;

use super::keys::{PublicKey, Signature};

/// Count distinct members of `committee` with a valid signature over
/// `message`.
///
/// Signatures from keys outside the committee are ignored, and a member
/// signing twice counts once.
pub fn count_valid_signers(
    committee: &BTreeSet<PublicKey>,
    message: &[u8],
    signatures: &[(PublicKey, Signature)],
) -> usize {
    let mut seen = BTreeSet::new();
    for (signer, signature) in signatures {
        if !committee.contains(signer) || seen.contains(signer) {
            continue;
        }
        if signer.verify(message, signature) {
            seen.insert(*signer);
        }
    }
    seen.len()
}

/// Whether at least `threshold` distinct committee members signed `message`.
///
/// A zero threshold is never met; a committee that accepts unsigned facts
/// is a misconfiguration, not a policy.
pub fn threshold_met(
    committee: &BTreeSet<PublicKey>,
    threshold: usize,
    message: &[u8],
    signatures: &[(PublicKey, Signature)],
) -> bool {
    threshold > 0 && count_valid_signers(committee, message, signatures) >= threshold
}
