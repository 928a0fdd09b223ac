//! # GiriGiriBashi: Header Consensus + Storage Proofs
//!
//! A light-client-shaped verifier. It does not follow the remote chain's
//! consensus itself; it trusts a set of header *reporters* (oracle
//! adapters, each watching the remote chain through a different channel)
//! and accepts a block header once `threshold` of them agree on its state
//! root. Storage proofs are then checked against accepted roots.
//!
//! ## Acceptance Rules
//!
//! - A reporter votes for `(chain, number, state_root)`.
//! - The first root for a given `(chain, number)` to collect `threshold`
//!   distinct votes is accepted. That decision is final.
//! - Any later vote for a different root at an accepted number is
//!   rejected with `ConflictingHeader`. Re-reporting the accepted root is a
//!   harmless no-op.
//! - The chain's head is the highest accepted number. Proofs anchored more
//!   than `max_proof_age` blocks behind head are stale.

use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crossmint_protocol::storage::{SlotKey, StorageValue};
use crossmint_protocol::{Address, CallContext, ChainId};

use super::{check_freshness, CommitmentProof, CommitmentVerifier, VerifierError};

/// Accepted headers and pending votes for one remote chain.
#[derive(Debug, Default)]
struct ChainHeaders {
    /// `number -> state_root -> reporters`.
    votes: HashMap<u64, HashMap<[u8; 32], BTreeSet<Address>>>,
    accepted: BTreeMap<u64, [u8; 32]>,
    head: u64,
}

#[derive(Debug)]
struct BashiState {
    reporters: BTreeSet<Address>,
    threshold: usize,
    max_proof_age: u64,
    chains: HashMap<ChainId, ChainHeaders>,
}

/// Header-consensus storage proof verifier.
#[derive(Debug)]
pub struct GiriGiriBashi {
    admin: Address,
    state: RwLock<BashiState>,
}

impl GiriGiriBashi {
    /// Deploy with no reporters and no tracked chains. `ctx.caller` becomes
    /// the admin. The threshold is checked against membership when set
    /// through [`set_threshold`](Self::set_threshold); the constructor only
    /// refuses zero.
    pub fn new(ctx: &CallContext, threshold: usize, max_proof_age: u64) -> Result<Self, VerifierError> {
        if threshold == 0 {
            return Err(VerifierError::InvalidThreshold {
                threshold,
                members: 0,
            });
        }
        Ok(Self {
            admin: ctx.caller,
            state: RwLock::new(BashiState {
                reporters: BTreeSet::new(),
                threshold,
                max_proof_age,
                chains: HashMap::new(),
            }),
        })
    }

    fn only_admin(&self, ctx: &CallContext) -> Result<(), VerifierError> {
        if ctx.caller != self.admin {
            return Err(VerifierError::Unauthorized { caller: ctx.caller });
        }
        Ok(())
    }

    /// Start tracking headers of `chain`.
    pub fn add_chain(&self, ctx: &CallContext, chain: ChainId) -> Result<(), VerifierError> {
        self.only_admin(ctx)?;
        self.state.write().chains.entry(chain).or_default();
        info!(%chain, "verifier tracking chain");
        Ok(())
    }

    /// Admit a header reporter.
    pub fn add_reporter(&self, ctx: &CallContext, reporter: Address) -> Result<(), VerifierError> {
        self.only_admin(ctx)?;
        self.state.write().reporters.insert(reporter);
        info!(%reporter, "header reporter added");
        Ok(())
    }

    /// Change the agreement threshold. Must be in `1..=reporters`.
    pub fn set_threshold(&self, ctx: &CallContext, threshold: usize) -> Result<(), VerifierError> {
        self.only_admin(ctx)?;
        let mut state = self.state.write();
        let members = state.reporters.len();
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

    /// Record `ctx.caller`'s vote for a header. Returns `true` when this
    /// vote got the header accepted.
    pub fn report_header(
        &self,
        ctx: &CallContext,
        chain: ChainId,
        number: u64,
        state_root: [u8; 32],
    ) -> Result<bool, VerifierError> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if !state.reporters.contains(&ctx.caller) {
            return Err(VerifierError::Unauthorized { caller: ctx.caller });
        }
        let threshold = state.threshold;
        let headers = state
            .chains
            .get_mut(&chain)
            .ok_or(VerifierError::UnknownChain(chain))?;

        if let Some(accepted) = headers.accepted.get(&number) {
            if *accepted == state_root {
                return Ok(false);
            }
            warn!(%chain, number, reporter = %ctx.caller, "conflicting header report");
            return Err(VerifierError::ConflictingHeader { chain, number });
        }

        let voters = headers
            .votes
            .entry(number)
            .or_default()
            .entry(state_root)
            .or_default();
        voters.insert(ctx.caller);
        debug!(%chain, number, votes = voters.len(), threshold, "header vote recorded");

        if voters.len() < threshold {
            return Ok(false);
        }
        headers.votes.remove(&number);
        headers.accepted.insert(number, state_root);
        headers.head = headers.head.max(number);
        info!(%chain, number, state_root = %hex::encode(state_root), "header accepted");
        Ok(true)
    }

    /// Accepted state root of `chain` at `number`.
    pub fn accepted_root(&self, chain: ChainId, number: u64) -> Option<[u8; 32]> {
        self.state
            .read()
            .chains
            .get(&chain)
            .and_then(|h| h.accepted.get(&number).copied())
    }

    /// Highest accepted block of `chain`.
    pub fn head(&self, chain: ChainId) -> Option<u64> {
        self.state.read().chains.get(&chain).map(|h| h.head)
    }

    /// Current agreement threshold.
    pub fn threshold(&self) -> usize {
        self.state.read().threshold
    }
}

impl CommitmentVerifier for GiriGiriBashi {
    fn verify(
        &self,
        chain_id: ChainId,
        account: &Address,
        slot: &SlotKey,
        expected: &StorageValue,
        proof: &CommitmentProof,
    ) -> Result<(), VerifierError> {
        let CommitmentProof::Storage(proof) = proof else {
            return Err(VerifierError::UnsupportedProof);
        };

        let state = self.state.read();
        let headers = state
            .chains
            .get(&chain_id)
            .ok_or(VerifierError::UnknownChain(chain_id))?;
        let root = headers
            .accepted
            .get(&proof.block_number)
            .ok_or(VerifierError::UnknownHeader {
                chain: chain_id,
                number: proof.block_number,
            })?;
        check_freshness(proof.block_number, headers.head, state.max_proof_age)?;

        if proof.account != *account || proof.slot != *slot {
            return Err(VerifierError::InvalidProof(format!(
                "proof is for {} slot {}, expected {} slot {}",
                proof.account, proof.slot, account, slot
            )));
        }
        let found = proof
            .verify(root)
            .map_err(|e| VerifierError::InvalidProof(e.to_string()))?;
        if found != *expected {
            return Err(VerifierError::ValueMismatch {
                expected: *expected,
                found,
            });
        }
        debug!(chain = %chain_id, %account, block = proof.block_number, "storage proof verified");
        Ok(())
    }
}
