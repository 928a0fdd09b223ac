//! # Relay Loop
//!
//! Moves facts between the two chains. Nothing here is trusted: the relayer
//! only carries headers, events and proofs, and the contracts verify every
//! one of them. A buggy or malicious relayer can delay the protocol but
//! cannot mint or release anything that was not committed.
//!
//! One [`Relayer::tick`]:
//!
//! ```text
//!   1. seal both chains, report each header to the opposite verifier
//!   2. Vault events       ──► pending mints
//!      Facilitator events ──► pending releases
//!   3. pending mints      ──► Facilitator::mint + storage proof
//!   4. pending releases   ──► Vault::verify_burn_and_release_collateral
//! ```
//!
//! Failures are sorted by [`ErrorKind`]: retryable ones stay queued for the
//! next tick, replays are dropped and counted, anything else is dropped
//! with an error log. A fact whose nonce the counterpart never issued is
//! dropped as soon as its proof turns out to be missing, and no fact is
//! submitted more than `max_attempts` times.

use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};

use crossmint_contracts::commitment::commitment_slot;
use crossmint_contracts::{
    BurnCommitment, CollateralToken, CommitmentProof, FacilitatorEvent, MintAuthorization,
    VaultEvent,
};
use crossmint_protocol::config::{FACILITATOR_BURNS_SLOT, VAULT_AUTHORIZATIONS_SLOT};
use crossmint_protocol::storage::BlockHeader;
use crossmint_protocol::{Address, ChainId, ErrorKind};

use crate::config::DEFAULT_MAX_ATTEMPTS;
use crate::devnet::Devnet;
use crate::metrics::SharedMetrics;

/// What happened to a queued fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Done,
    Retry,
    Drop,
}

fn classify(kind: ErrorKind) -> Outcome {
    match kind {
        // Configuration problems are fixed by an administrator; the fact is
        // still good afterwards.
        k if k.is_retryable() || k == ErrorKind::Configuration => Outcome::Retry,
        _ => Outcome::Drop,
    }
}

/// A fact waiting in one of the queues.
#[derive(Debug, Clone)]
struct Queued<T> {
    fact: T,
    attempts: u32,
}

impl<T> Queued<T> {
    fn new(fact: T) -> Self {
        Self { fact, attempts: 0 }
    }
}

/// Per-tick summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Header reports accepted across both verifiers.
    pub headers_reported: usize,
    /// Mints executed.
    pub minted: usize,
    /// Releases executed.
    pub released: usize,
    /// Facts left queued for another attempt.
    pub retried: usize,
    /// Facts dropped.
    pub dropped: usize,
}

/// Point-in-time view for `/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayerStatus {
    /// Home chain id.
    pub home_chain_id: ChainId,
    /// Target chain id.
    pub target_chain_id: ChainId,
    /// Latest sealed home block.
    pub home_height: u64,
    /// Latest sealed target block.
    pub target_height: u64,
    /// Authorizations awaiting mint.
    pub pending_mints: usize,
    /// Burns awaiting release.
    pub pending_releases: usize,
    /// Stable units outstanding according to the Facilitator.
    pub total_minted: u128,
}

/// Relay state over a [`Devnet`].
pub struct Relayer {
    devnet: Devnet,
    account: Address,
    metrics: SharedMetrics,
    max_attempts: u32,
    pending_mints: VecDeque<Queued<MintAuthorization>>,
    pending_releases: VecDeque<Queued<BurnCommitment>>,
}

impl Relayer {
    /// Relay over `devnet`, submitting as a fixed relayer account.
    pub fn new(devnet: Devnet, metrics: SharedMetrics) -> Self {
        Self {
            devnet,
            account: Address::derive("crossmint-relayer"),
            metrics,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            pending_mints: VecDeque::new(),
            pending_releases: VecDeque::new(),
        }
    }

    /// Give up on a fact after `max_attempts` failed submissions.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// The underlying chains and contracts.
    pub fn devnet(&self) -> &Devnet {
        &self.devnet
    }

    /// Mutable access, for driving user actions in `simulate` and tests.
    pub fn devnet_mut(&mut self) -> &mut Devnet {
        &mut self.devnet
    }

    /// Queue an authorization that did not come from this relayer's own
    /// event stream.
    #[allow(dead_code)]
    pub fn enqueue_mint(&mut self, authorization: MintAuthorization) {
        self.pending_mints.push_back(Queued::new(authorization));
        self.update_gauges();
    }

    /// Queue a burn that did not come from this relayer's own event stream.
    #[allow(dead_code)]
    pub fn enqueue_release(&mut self, burn: BurnCommitment) {
        self.pending_releases.push_back(Queued::new(burn));
        self.update_gauges();
    }

    /// Current heights and queue depths.
    pub fn status(&self) -> RelayerStatus {
        RelayerStatus {
            home_chain_id: self.devnet.home.id(),
            target_chain_id: self.devnet.target.id(),
            home_height: self.devnet.home.height(),
            target_height: self.devnet.target.height(),
            pending_mints: self.pending_mints.len(),
            pending_releases: self.pending_releases.len(),
            total_minted: self.devnet.facilitator.total_minted(),
        }
    }

    /// Run one relay round.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        let home_header = self.devnet.seal_home();
        let target_header = self.devnet.seal_target();
        report.headers_reported += self.report_home_header(&home_header);
        report.headers_reported += self.report_target_header(&target_header);

        self.collect_events();
        self.relay_mints(&mut report);
        self.relay_releases(&mut report);
        self.update_gauges();

        if report.minted + report.released + report.retried + report.dropped > 0 {
            info!(
                home = home_header.number,
                target = target_header.number,
                minted = report.minted,
                released = report.released,
                retried = report.retried,
                dropped = report.dropped,
                "relay tick"
            );
        } else {
            debug!(home = home_header.number, target = target_header.number, "relay tick idle");
        }
        report
    }

    // -----------------------------------------------------------------------
    // Headers
    // -----------------------------------------------------------------------

    /// Every reporter vouches for a home header on the target verifier.
    fn report_home_header(&self, header: &BlockHeader) -> usize {
        let mut accepted = 0;
        for reporter in &self.devnet.reporters {
            let ctx = self.devnet.target_ctx(*reporter);
            match self.devnet.target_verifier.report_header(
                &ctx,
                header.chain_id,
                header.number,
                header.state_root,
            ) {
                Ok(_) => accepted += 1,
                Err(e) => warn!(%reporter, block = header.number, error = %e, "home header report rejected"),
            }
        }
        self.metrics.headers_reported_total.inc_by(accepted as u64);
        self.metrics.home_height.set(header.number as i64);
        accepted
    }

    /// Every reporter vouches for a target header on the home verifier.
    fn report_target_header(&self, header: &BlockHeader) -> usize {
        let mut accepted = 0;
        for reporter in &self.devnet.reporters {
            let ctx = self.devnet.home_ctx(*reporter);
            match self.devnet.home_verifier.report_header(
                &ctx,
                header.chain_id,
                header.number,
                header.state_root,
            ) {
                Ok(_) => accepted += 1,
                Err(e) => warn!(%reporter, block = header.number, error = %e, "target header report rejected"),
            }
        }
        self.metrics.headers_reported_total.inc_by(accepted as u64);
        self.metrics.target_height.set(header.number as i64);
        accepted
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    fn collect_events(&mut self) {
        let home = self.devnet.home.id();
        for event in self.devnet.vault.take_events() {
            if let VaultEvent::AuthorizedMint {
                nonce,
                recipient,
                amount,
                ..
            } = event
            {
                debug!(nonce, %recipient, amount, "queued mint authorization");
                self.pending_mints.push_back(Queued::new(MintAuthorization {
                    nonce,
                    recipient,
                    amount,
                    source_chain: home,
                }));
            }
        }

        let target = self.devnet.target.id();
        for event in self.devnet.facilitator.take_events() {
            if let FacilitatorEvent::BurnCommitted {
                nonce,
                user,
                collateral_asset,
                amount,
            } = event
            {
                debug!(nonce, %user, amount, "queued burn commitment");
                self.pending_releases.push_back(Queued::new(BurnCommitment {
                    nonce,
                    user,
                    collateral_asset,
                    amount,
                    source_chain: target,
                }));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    fn relay_mints(&mut self, report: &mut TickReport) {
        let mut retry = VecDeque::new();
        while let Some(mut entry) = self.pending_mints.pop_front() {
            entry.attempts += 1;
            match self.submit_mint(&entry.fact) {
                Outcome::Done => {
                    report.minted += 1;
                    self.metrics.mints_relayed_total.inc();
                }
                Outcome::Retry if entry.attempts >= self.max_attempts => {
                    self.abandon("mint", entry.fact.nonce, entry.attempts);
                    report.dropped += 1;
                }
                Outcome::Retry => {
                    report.retried += 1;
                    retry.push_back(entry);
                }
                Outcome::Drop => report.dropped += 1,
            }
        }
        self.pending_mints = retry;
    }

    fn submit_mint(&mut self, auth: &MintAuthorization) -> Outcome {
        let slot = commitment_slot(VAULT_AUTHORIZATIONS_SLOT, auth.nonce);
        let proof = match self.devnet.home.prove_storage(
            self.devnet.home.height(),
            &self.devnet.vault.address(),
            &slot,
        ) {
            Ok(p) => CommitmentProof::Storage(p),
            Err(e) => {
                let issued = self.devnet.vault.authorization_nonce();
                if auth.nonce >= issued {
                    error!(nonce = auth.nonce, issued, "authorization nonce was never issued, dropping");
                    self.metrics.record_failure("mint", ErrorKind::InvalidInput);
                    self.metrics.facts_abandoned_total.inc();
                    return Outcome::Drop;
                }
                warn!(nonce = auth.nonce, error = %e, "no proof for authorization yet");
                return Outcome::Retry;
            }
        };

        let ctx = self.devnet.target_ctx(self.account);
        match self.devnet.facilitator.mint(
            &ctx,
            &mut self.devnet.stable,
            auth.recipient,
            auth.amount,
            auth.nonce,
            &proof,
        ) {
            Ok(()) => Outcome::Done,
            Err(e) => self.on_failure("mint", auth.nonce, e.kind(), &e),
        }
    }

    fn relay_releases(&mut self, report: &mut TickReport) {
        let mut retry = VecDeque::new();
        while let Some(mut entry) = self.pending_releases.pop_front() {
            entry.attempts += 1;
            match self.submit_release(&entry.fact) {
                Outcome::Done => {
                    report.released += 1;
                    self.metrics.releases_relayed_total.inc();
                }
                Outcome::Retry if entry.attempts >= self.max_attempts => {
                    self.abandon("release", entry.fact.nonce, entry.attempts);
                    report.dropped += 1;
                }
                Outcome::Retry => {
                    report.retried += 1;
                    retry.push_back(entry);
                }
                Outcome::Drop => report.dropped += 1,
            }
        }
        self.pending_releases = retry;
    }

    fn submit_release(&mut self, burn: &BurnCommitment) -> Outcome {
        if burn.collateral_asset != self.devnet.collateral.address() {
            error!(nonce = burn.nonce, asset = %burn.collateral_asset, "burn names an unknown collateral asset");
            self.metrics.record_failure("release", ErrorKind::InvalidInput);
            return Outcome::Drop;
        }

        let slot = commitment_slot(FACILITATOR_BURNS_SLOT, burn.nonce);
        let proof = match self.devnet.target.prove_storage(
            self.devnet.target.height(),
            &self.devnet.facilitator.address(),
            &slot,
        ) {
            Ok(p) => CommitmentProof::Storage(p),
            Err(e) => {
                let issued = self.devnet.facilitator.burn_nonce();
                if burn.nonce >= issued {
                    error!(nonce = burn.nonce, issued, "burn nonce was never issued, dropping");
                    self.metrics.record_failure("release", ErrorKind::InvalidInput);
                    self.metrics.facts_abandoned_total.inc();
                    return Outcome::Drop;
                }
                warn!(nonce = burn.nonce, error = %e, "no proof for burn yet");
                return Outcome::Retry;
            }
        };

        let ctx = self.devnet.home_ctx(self.account);
        match self.devnet.vault.verify_burn_and_release_collateral(
            &ctx,
            &mut self.devnet.collateral,
            burn.user,
            burn.amount,
            burn.nonce,
            &proof,
        ) {
            Ok(_) => Outcome::Done,
            Err(e) => self.on_failure("release", burn.nonce, e.kind(), &e),
        }
    }

    fn on_failure(
        &self,
        direction: &'static str,
        nonce: u64,
        kind: ErrorKind,
        err: &dyn std::error::Error,
    ) -> Outcome {
        self.metrics.record_failure(direction, kind);
        let outcome = classify(kind);
        match (kind, outcome) {
            (ErrorKind::Replay, _) => {
                self.metrics.replays_dropped_total.inc();
                warn!(direction, nonce, error = %err, "replay dropped");
            }
            (_, Outcome::Retry) => warn!(direction, nonce, %kind, error = %err, "submission failed, will retry"),
            _ => error!(direction, nonce, %kind, error = %err, "submission failed, dropping"),
        }
        outcome
    }

    fn abandon(&self, direction: &'static str, nonce: u64, attempts: u32) {
        self.metrics.facts_abandoned_total.inc();
        error!(direction, nonce, attempts, "retries exhausted, dropping");
    }

    fn update_gauges(&self) {
        self.metrics.pending_mints.set(self.pending_mints.len() as i64);
        self.metrics.pending_releases.set(self.pending_releases.len() as i64);
    }
}
