//! Shared two-chain fixture for the integration tests.
//!
//! Home chain 1 hosts the oracle, the collateral token and the Vault. Target
//! chain 100 hosts the stable asset and the Facilitator. Each side has a
//! GiriGiriBashi watching the other, fed by three reporters with a
//! threshold of two.

#![allow(dead_code)]

use std::sync::Arc;

use crossmint_contracts::verifier::VerifierError;
use crossmint_contracts::{
    BurnCommitment, CommitmentProof, CollateralToken, Facilitator, FacilitatorError,
    FacilitatorParams, GiriGiriBashi, MintAuthorization, PriceOracle, StableAsset, Vault,
    VaultError, VaultParams, YieldBearingToken,
};
use crossmint_contracts::commitment::commitment_slot;
use crossmint_protocol::config::{
    DEFAULT_MINT_RATIO_BPS, FACILITATOR_BURNS_SLOT, PRICE_UNIT, VAULT_AUTHORIZATIONS_SLOT,
};
use crossmint_protocol::storage::{BlockHeader, Chain, StateSnapshot};
use crossmint_protocol::{Address, CallContext, ChainId};

pub const HOME: ChainId = ChainId(1);
pub const TARGET: ChainId = ChainId(100);
pub const E18: u128 = 1_000_000_000_000_000_000;
pub const MAX_PROOF_AGE: u64 = 16;

pub fn admin() -> Address {
    Address::derive("admin")
}

pub fn user() -> Address {
    Address::derive("user")
}

pub fn reporters() -> Vec<Address> {
    (0..3).map(|i| Address::derive(&format!("reporter-{i}"))).collect()
}

pub struct Harness {
    pub home: Chain,
    pub target: Chain,
    pub oracle: Arc<PriceOracle>,
    pub collateral: YieldBearingToken,
    pub stable: StableAsset,
    pub vault: Vault,
    pub facilitator: Facilitator,
    /// Lives on the home chain, watches the target chain.
    pub home_verifier: Arc<GiriGiriBashi>,
    /// Lives on the target chain, watches the home chain.
    pub target_verifier: Arc<GiriGiriBashi>,
}

fn watcher(ctx: &CallContext, remote: ChainId) -> Arc<GiriGiriBashi> {
    let bashi = Arc::new(GiriGiriBashi::new(ctx, 1, MAX_PROOF_AGE).unwrap());
    bashi.add_chain(ctx, remote).unwrap();
    for r in reporters() {
        bashi.add_reporter(ctx, r).unwrap();
    }
    bashi.set_threshold(ctx, 2).unwrap();
    bashi
}

impl Harness {
    /// Deploy and wire both sides: 2500 collateral price, 1.0 stable price.
    pub fn new() -> Self {
        Self::with_ratio(DEFAULT_MINT_RATIO_BPS)
    }

    pub fn with_ratio(mint_ratio_bps: u32) -> Self {
        let home = Chain::new(HOME);
        let target = Chain::new(TARGET);
        let home_ctx = home.context(admin());
        let target_ctx = target.context(admin());

        let vault_addr = Address::derive("vault");
        let facilitator_addr = Address::derive("facilitator");
        let stable_addr = Address::derive("stable");

        let oracle = Arc::new(PriceOracle::new(&home_ctx));
        let mut collateral = YieldBearingToken::new(Address::derive("aToken"), &home_ctx, 18);
        oracle
            .set_asset_price(&home_ctx, collateral.address(), 2_500 * PRICE_UNIT)
            .unwrap();
        oracle
            .set_asset_price(&home_ctx, stable_addr, PRICE_UNIT)
            .unwrap();

        let home_verifier = watcher(&home_ctx, TARGET);
        let target_verifier = watcher(&target_ctx, HOME);

        let vault = Vault::new(
            vault_addr,
            &home_ctx,
            VaultParams {
                stable_asset: stable_addr,
                chain_id: HOME,
                target_chain_id: TARGET,
                commitment_slot: FACILITATOR_BURNS_SLOT,
                mint_ratio_bps,
                counterpart: Some(facilitator_addr),
            },
            oracle.clone(),
            home_verifier.clone(),
        )
        .unwrap();

        let facilitator = Facilitator::new(
            facilitator_addr,
            &target_ctx,
            FacilitatorParams {
                stable_asset: stable_addr,
                chain_id: TARGET,
                target_chain_id: HOME,
                commitment_slot: VAULT_AUTHORIZATIONS_SLOT,
                counterpart: Some(vault_addr),
            },
            target_verifier.clone(),
        )
        .unwrap();

        let mut stable = StableAsset::new(stable_addr, &target_ctx, 18);
        stable.set_minter(&target_ctx, facilitator_addr).unwrap();

        collateral.mint(&home_ctx, user(), 1_000 * E18).unwrap();
        collateral
            .approve(&home_ctx.with_caller(user()), vault_addr, u128::MAX)
            .unwrap();

        Self {
            home,
            target,
            oracle,
            collateral,
            stable,
            vault,
            facilitator,
            home_verifier,
            target_verifier,
        }
    }

    pub fn home_ctx(&self, caller: Address) -> CallContext {
        self.home.context(caller)
    }

    pub fn target_ctx(&self, caller: Address) -> CallContext {
        self.target.context(caller)
    }

    /// Seal the home chain and have every reporter vouch for the header on
    /// the target side.
    pub fn seal_home(&mut self) -> BlockHeader {
        let mut snap = StateSnapshot::new();
        snap.insert(self.vault.address(), self.vault.storage().clone());
        let header = self.home.seal(snap);
        for r in reporters() {
            self.target_verifier
                .report_header(&self.target.context(r), HOME, header.number, header.state_root)
                .unwrap();
        }
        header
    }

    /// Seal the target chain and report its header to the home side.
    pub fn seal_target(&mut self) -> BlockHeader {
        let mut snap = StateSnapshot::new();
        snap.insert(self.facilitator.address(), self.facilitator.storage().clone());
        let header = self.target.seal(snap);
        for r in reporters() {
            self.home_verifier
                .report_header(&self.home.context(r), TARGET, header.number, header.state_root)
                .unwrap();
        }
        header
    }

    /// Deposit `amount` collateral from the user and authorize a mint.
    pub fn deposit(&mut self, amount: u128) -> Result<MintAuthorization, VaultError> {
        let ctx = self.home_ctx(user());
        self.vault.mint(&ctx, &mut self.collateral, user(), amount)
    }

    /// Storage proof of authorization `nonce` at the latest home block.
    pub fn authorization_proof(&self, nonce: u64) -> CommitmentProof {
        let slot = commitment_slot(VAULT_AUTHORIZATIONS_SLOT, nonce);
        CommitmentProof::Storage(
            self.home
                .prove_storage(self.home.height(), &self.vault.address(), &slot)
                .unwrap(),
        )
    }

    /// Storage proof of burn `nonce` at the latest target block.
    pub fn burn_proof(&self, nonce: u64) -> CommitmentProof {
        let slot = commitment_slot(FACILITATOR_BURNS_SLOT, nonce);
        CommitmentProof::Storage(
            self.target
                .prove_storage(self.target.height(), &self.facilitator.address(), &slot)
                .unwrap(),
        )
    }

    /// Relay an authorization to the Facilitator with a fresh proof.
    pub fn relay_mint(&mut self, auth: &MintAuthorization) -> Result<(), FacilitatorError> {
        self.seal_home();
        let proof = self.authorization_proof(auth.nonce);
        let ctx = self.target_ctx(Address::derive("relayer"));
        self.facilitator.mint(
            &ctx,
            &mut self.stable,
            auth.recipient,
            auth.amount,
            auth.nonce,
            &proof,
        )
    }

    /// Approve and burn `amount` of the user's stable asset.
    pub fn burn(&mut self, amount: u128) -> Result<BurnCommitment, FacilitatorError> {
        let ctx = self.target_ctx(user());
        self.stable
            .approve(&ctx, self.facilitator.address(), amount)
            .unwrap();
        let asset = self.collateral.address();
        self.facilitator
            .burn_and_release_collateral(&ctx, &mut self.stable, asset, user(), amount)
    }

    /// Relay a burn commitment to the Vault with a fresh proof.
    pub fn relay_release(&mut self, burn: &BurnCommitment) -> Result<u128, VaultError> {
        self.seal_target();
        let proof = self.burn_proof(burn.nonce);
        self.release_with(burn.user, burn.amount, burn.nonce, &proof)
    }

    /// Submit a release with an arbitrary proof.
    pub fn release_with(
        &mut self,
        user: Address,
        amount: u128,
        nonce: u64,
        proof: &CommitmentProof,
    ) -> Result<u128, VaultError> {
        let ctx = self.home_ctx(Address::derive("relayer"));
        self.vault.verify_burn_and_release_collateral(
            &ctx,
            &mut self.collateral,
            user,
            amount,
            nonce,
            proof,
        )
    }
}

/// Unwrap the verifier error inside a commitment mismatch.
pub fn vault_verifier_error(err: &VaultError) -> Option<&VerifierError> {
    match err {
        VaultError::CommitmentMismatch { source, .. } => Some(source),
        _ => None,
    }
}
