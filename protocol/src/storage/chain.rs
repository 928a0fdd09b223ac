//! # Simulated Chain
//!
//! Just enough of a blockchain to make storage proofs meaningful: a
//! hash-linked list of headers, each committing to the state root of a
//! [`StateSnapshot`]. Contracts execute against a [`CallContext`] handed
//! out by [`Chain::context`]; after a batch of calls, whoever drives the
//! chain gathers the contracts' storage into a snapshot and
//! [`seal`](Chain::seal)s it into the next block.
//!
//! Old snapshots are pruned after [`SNAPSHOT_RETENTION`] blocks. Headers are
//! kept forever, they are small.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::proof::{ProofError, StorageProof};
use super::slots::SlotKey;
use super::state::StateSnapshot;
use crate::config::{BLOCK_HEADER_DOMAIN, SNAPSHOT_RETENTION};
use crate::crypto::hash::domain_separated_hash;
use crate::types::{Address, CallContext, ChainId};

/// Header of a sealed block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Chain the block belongs to.
    pub chain_id: ChainId,
    /// Height. Genesis is 0.
    pub number: u64,
    /// Hash of the previous header (all zeros for genesis).
    pub parent_hash: [u8; 32],
    /// State root after executing this block.
    pub state_root: [u8; 32],
}

impl BlockHeader {
    /// Domain-separated header hash.
    pub fn hash(&self) -> [u8; 32] {
        domain_separated_hash(
            BLOCK_HEADER_DOMAIN,
            &[
                &self.chain_id.to_be_bytes(),
                &self.number.to_be_bytes(),
                &self.parent_hash,
                &self.state_root,
            ],
        )
    }
}

/// A single simulated chain.
#[derive(Debug, Clone)]
pub struct Chain {
    id: ChainId,
    headers: Vec<BlockHeader>,
    snapshots: BTreeMap<u64, StateSnapshot>,
}

impl Chain {
    /// Start a chain at its genesis block (empty state).
    pub fn new(id: ChainId) -> Self {
        let genesis = BlockHeader {
            chain_id: id,
            number: 0,
            parent_hash: [0u8; 32],
            state_root: [0u8; 32],
        };
        let mut snapshots = BTreeMap::new();
        snapshots.insert(0, StateSnapshot::new());
        Self {
            id,
            headers: vec![genesis],
            snapshots,
        }
    }

    /// Chain id.
    pub fn id(&self) -> ChainId {
        self.id
    }

    /// Number of the latest sealed block.
    pub fn height(&self) -> u64 {
        self.tip().number
    }

    /// Latest sealed header.
    pub fn tip(&self) -> &BlockHeader {
        // `new` pushes genesis and nothing ever pops.
        &self.headers[self.headers.len() - 1]
    }

    /// Header at `number`, if sealed.
    pub fn header(&self, number: u64) -> Option<&BlockHeader> {
        usize::try_from(number).ok().and_then(|n| self.headers.get(n))
    }

    /// Seal `snapshot` into the next block and return its header.
    pub fn seal(&mut self, snapshot: StateSnapshot) -> BlockHeader {
        let header = BlockHeader {
            chain_id: self.id,
            number: self.height() + 1,
            parent_hash: self.tip().hash(),
            state_root: snapshot.state_root(),
        };
        debug!(
            chain = %self.id,
            number = header.number,
            state_root = %hex::encode(header.state_root),
            "sealed block"
        );

        self.snapshots.insert(header.number, snapshot);
        while self.snapshots.len() > SNAPSHOT_RETENTION {
            if let Some(oldest) = self.snapshots.keys().next().copied() {
                self.snapshots.remove(&oldest);
            }
        }
        self.headers.push(header.clone());
        header
    }

    /// Storage proof for `account.slot` as of block `number`.
    pub fn prove_storage(
        &self,
        number: u64,
        account: &Address,
        slot: &SlotKey,
    ) -> Result<StorageProof, ProofError> {
        let snapshot = self
            .snapshots
            .get(&number)
            .ok_or(ProofError::UnknownBlock(number))?;
        let mut proof = snapshot.prove(account, slot)?;
        proof.block_number = number;
        Ok(proof)
    }

    /// Execution context for a call included in the next block.
    pub fn context(&self, caller: Address) -> CallContext {
        CallContext::new(caller, self.id, self.height() + 1)
    }
}
