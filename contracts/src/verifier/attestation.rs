//! Signed-oracle verifier.
//!
//! A committee of Ed25519 keys watches the remote chain and signs storage
//! words it has seen. `threshold` distinct valid signatures make a fact.
//! Cheaper than storage proofs and weaker: the committee is the whole
//! security assumption.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use crossmint_protocol::config::STORAGE_ATTESTATION_DOMAIN;
use crossmint_protocol::crypto::{count_valid_signers, domain_separated_hash, PublicKey};
use crossmint_protocol::storage::{SlotKey, StorageValue};
use crossmint_protocol::{Address, CallContext, ChainId};

use super::{check_freshness, CommitmentProof, CommitmentVerifier, VerifierError};

/// The message attesters sign for one storage word.
pub fn attestation_message(
    chain: ChainId,
    block_number: u64,
    account: &Address,
    slot: &SlotKey,
    value: &StorageValue,
) -> [u8; 32] {
    domain_separated_hash(
        STORAGE_ATTESTATION_DOMAIN,
        &[
            &chain.to_be_bytes(),
            &block_number.to_be_bytes(),
            account.as_bytes(),
            &slot.0,
            value,
        ],
    )
}

#[derive(Debug)]
struct AttestationState {
    committee: BTreeSet<PublicKey>,
    threshold: usize,
    max_proof_age: u64,
    /// Highest attested block accepted per chain.
    heads: HashMap<ChainId, u64>,
}

/// Threshold-of-attesters verifier.
#[derive(Debug)]
pub struct AttestationVerifier {
    admin: Address,
    state: RwLock<AttestationState>,
}

impl AttestationVerifier {
    /// Deploy with an empty committee. `ctx.caller` becomes the admin.
    pub fn new(ctx: &CallContext, threshold: usize, max_proof_age: u64) -> Result<Self, VerifierError> {
        if threshold == 0 {
            return Err(VerifierError::InvalidThreshold {
                threshold,
                members: 0,
            });
        }
        Ok(Self {
            admin: ctx.caller,
            state: RwLock::new(AttestationState {
                committee: BTreeSet::new(),
                threshold,
                max_proof_age,
                heads: HashMap::new(),
            }),
        })
    }

    fn only_admin(&self, ctx: &CallContext) -> Result<(), VerifierError> {
        if ctx.caller != self.admin {
            return Err(VerifierError::Unauthorized { caller: ctx.caller });
        }
        Ok(())
    }

    /// Start accepting attestations about `chain`.
    pub fn add_chain(&self, ctx: &CallContext, chain: ChainId) -> Result<(), VerifierError> {
        self.only_admin(ctx)?;
        self.state.write().heads.entry(chain).or_insert(0);
        Ok(())
    }

    /// Admit an attester key.
    pub fn add_member(&self, ctx: &CallContext, member: PublicKey) -> Result<(), VerifierError> {
        self.only_admin(ctx)?;
        self.state.write().committee.insert(member);
        info!(%member, "attester added");
        Ok(())
    }

    /// Change the signature threshold. Must be in `1..=committee`.
    pub fn set_threshold(&self, ctx: &CallContext, threshold: usize) -> Result<(), VerifierError> {
        self.only_admin(ctx)?;
        let mut state = self.state.write();
        let members = state.committee.len();
        if threshold == 0 || threshold > members {
            return Err(VerifierError::InvalidThreshold { threshold, members });
        }
        state.threshold = threshold;
        Ok(())
    }

    /// Change the freshness bound.
    pub fn set_max_proof_age(&self, ctx: &CallContext, max_proof_age: u64) -> Result<(), VerifierError> {
        self.only_admin(ctx)?;
        self.state.write().max_proof_age = max_proof_age;
        Ok(())
    }

    /// Highest accepted attested block of `chain`.
    pub fn head(&self, chain: ChainId) -> Option<u64> {
        self.state.read().heads.get(&chain).copied()
    }
}

impl AttestationVerifier {
    /// Checks `proof` against the current committee and head. Returns the
    /// attested block.
    fn check(
        state: &AttestationState,
        chain_id: ChainId,
        account: &Address,
        slot: &SlotKey,
        expected: &StorageValue,
        proof: &CommitmentProof,
    ) -> Result<u64, VerifierError> {
        let CommitmentProof::Attestation(attestation) = proof else {
            return Err(VerifierError::UnsupportedProof);
        };

        let head = *state
            .heads
            .get(&chain_id)
            .ok_or(VerifierError::UnknownChain(chain_id))?;
        check_freshness(attestation.block_number, head, state.max_proof_age)?;

        let message = attestation_message(
            chain_id,
            attestation.block_number,
            account,
            slot,
            &attestation.value,
        );
        let valid = count_valid_signers(&state.committee, &message, &attestation.signatures);
        if valid < state.threshold {
            return Err(VerifierError::InsufficientAttestations {
                valid,
                threshold: state.threshold,
            });
        }
        if attestation.value != *expected {
            return Err(VerifierError::ValueMismatch {
                expected: *expected,
                found: attestation.value,
            });
        }
        debug!(chain = %chain_id, %account, block = attestation.block_number, valid, "attestation verified");
        Ok(attestation.block_number)
    }
}

impl CommitmentVerifier for AttestationVerifier {
    fn verify(
        &self,
        chain_id: ChainId,
        account: &Address,
        slot: &SlotKey,
        expected: &StorageValue,
        proof: &CommitmentProof,
    ) -> Result<(), VerifierError> {
        Self::check(&self.state.read(), chain_id, account, slot, expected, proof).map(|_| ())
    }

    fn record_accepted(
        &self,
        chain_id: ChainId,
        account: &Address,
        slot: &SlotKey,
        expected: &StorageValue,
        proof: &CommitmentProof,
    ) {
        let mut state = self.state.write();
        let Ok(block) = Self::check(&state, chain_id, account, slot, expected, proof) else {
            return;
        };
        if let Some(head) = state.heads.get_mut(&chain_id) {
            if block > *head {
                *head = block;
                debug!(chain = %chain_id, head = block, "attested head advanced");
            }
        }
    }
}
