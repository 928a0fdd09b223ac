//! # Devnet
//!
//! Two in-process chains with the full contract set deployed and wired:
//!
//! ```text
//!   home chain                              target chain
//!   ┌──────────────────────────┐            ┌──────────────────────────┐
//!   │ PriceOracle              │            │ StableAsset (minter=F)   │
//!   │ YieldBearingToken        │  headers   │ Facilitator ──► Vault    │
//!   │ Vault ──► Facilitator    │ ◄────────► │ GiriGiriBashi(home)      │
//!   │ GiriGiriBashi(target)    │  proofs    │                          │
//!   └──────────────────────────┘            └──────────────────────────┘
//! ```
//!
//! Each verifier is administered by the deployer and fed by the same set of
//! reporter keys, which the relayer drives.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crossmint_contracts::{
    CollateralToken, Facilitator, FacilitatorParams, GiriGiriBashi, PriceOracle, StableAsset,
    Vault, VaultParams, YieldBearingToken,
};
use crossmint_protocol::config::{
    chain_name, FACILITATOR_BURNS_SLOT, STABLE_ASSET_DECIMALS, VAULT_AUTHORIZATIONS_SLOT,
};
use crossmint_protocol::storage::{BlockHeader, Chain, StateSnapshot};
use crossmint_protocol::{Address, CallContext, ChainId};

use crate::config::RelayerConfig;

/// Both chains and every deployed contract.
pub struct Devnet {
    /// Home chain.
    pub home: Chain,
    /// Target chain.
    pub target: Chain,
    /// Header reporter accounts, registered on both verifiers.
    pub reporters: Vec<Address>,
    /// Home-chain price oracle.
    pub oracle: Arc<PriceOracle>,
    /// Home-chain collateral.
    pub collateral: YieldBearingToken,
    /// Target-chain stable asset.
    pub stable: StableAsset,
    /// Home-chain Vault.
    pub vault: Vault,
    /// Target-chain Facilitator.
    pub facilitator: Facilitator,
    /// Home-chain verifier of target-chain facts.
    pub home_verifier: Arc<GiriGiriBashi>,
    /// Target-chain verifier of home-chain facts.
    pub target_verifier: Arc<GiriGiriBashi>,
}

fn deploy_verifier(
    ctx: &CallContext,
    remote: ChainId,
    reporters: &[Address],
    config: &RelayerConfig,
) -> Result<Arc<GiriGiriBashi>> {
    let bashi = GiriGiriBashi::new(ctx, 1, config.max_proof_age)?;
    bashi.add_chain(ctx, remote)?;
    for reporter in reporters {
        bashi.add_reporter(ctx, *reporter)?;
    }
    bashi.set_threshold(ctx, config.threshold)?;
    Ok(Arc::new(bashi))
}

impl Devnet {
    /// Deploy everything described by `config`.
    pub fn from_config(config: &RelayerConfig) -> Result<Self> {
        config.validate()?;

        let home = Chain::new(config.home_chain_id);
        let target = Chain::new(config.target_chain_id);
        let admin = Address::derive("crossmint-admin");
        let reporters: Vec<Address> = (0..config.reporters)
            .map(|i| Address::derive(&format!("crossmint-reporter-{i}")))
            .collect();
        let home_ctx = home.context(admin);
        let target_ctx = target.context(admin);

        let vault_address = Address::derive("crossmint-vault");
        let facilitator_address = Address::derive("crossmint-facilitator");
        let stable_address = Address::derive("crossmint-stable");

        let oracle = Arc::new(PriceOracle::new(&home_ctx));
        let mut collateral = YieldBearingToken::new(
            Address::derive("crossmint-collateral"),
            &home_ctx,
            config.collateral_decimals,
        );
        oracle.set_asset_price(&home_ctx, collateral.address(), u128::from(config.collateral_price))?;
        oracle.set_asset_price(&home_ctx, stable_address, u128::from(config.stable_price))?;

        let home_verifier = deploy_verifier(&home_ctx, config.target_chain_id, &reporters, config)
            .context("failed to deploy home verifier")?;
        let target_verifier = deploy_verifier(&target_ctx, config.home_chain_id, &reporters, config)
            .context("failed to deploy target verifier")?;

        let vault = Vault::new(
            vault_address,
            &home_ctx,
            VaultParams {
                stable_asset: stable_address,
                chain_id: config.home_chain_id,
                target_chain_id: config.target_chain_id,
                commitment_slot: FACILITATOR_BURNS_SLOT,
                mint_ratio_bps: config.mint_ratio_bps,
                counterpart: None,
            },
            oracle.clone(),
            home_verifier.clone(),
        )?;
        let facilitator = Facilitator::new(
            facilitator_address,
            &target_ctx,
            FacilitatorParams {
                stable_asset: stable_address,
                chain_id: config.target_chain_id,
                target_chain_id: config.home_chain_id,
                commitment_slot: VAULT_AUTHORIZATIONS_SLOT,
                counterpart: None,
            },
            target_verifier.clone(),
        )?;
        let mut stable = StableAsset::new(stable_address, &target_ctx, STABLE_ASSET_DECIMALS);
        stable.set_minter(&target_ctx, facilitator_address)?;

        let unit = 10u128
            .checked_pow(u32::from(config.collateral_decimals))
            .context("collateral decimals too large")?;
        for (label, whole) in &config.seed_accounts {
            let amount = u128::from(*whole)
                .checked_mul(unit)
                .context("seed balance overflows")?;
            collateral.mint(&home_ctx, Address::derive(label), amount)?;
        }

        let mut devnet = Self {
            home,
            target,
            reporters,
            oracle,
            collateral,
            stable,
            vault,
            facilitator,
            home_verifier,
            target_verifier,
        };

        // Bind the pair after deployment, the way a deploy script does.
        devnet.vault.set_account(&home_ctx, facilitator_address)?;
        devnet.facilitator.set_account(&target_ctx, vault_address)?;

        info!(
            home = %chain_name(config.home_chain_id),
            target = %chain_name(config.target_chain_id),
            vault = %vault_address,
            facilitator = %facilitator_address,
            reporters = config.reporters,
            threshold = config.threshold,
            "devnet deployed"
        );
        Ok(devnet)
    }

    /// Context for `caller` on the home chain's next block.
    pub fn home_ctx(&self, caller: Address) -> CallContext {
        self.home.context(caller)
    }

    /// Context for `caller` on the target chain's next block.
    pub fn target_ctx(&self, caller: Address) -> CallContext {
        self.target.context(caller)
    }

    /// Seal the home chain with the Vault's current storage.
    pub fn seal_home(&mut self) -> BlockHeader {
        let mut snapshot = StateSnapshot::new();
        snapshot.insert(self.vault.address(), self.vault.storage().clone());
        self.home.seal(snapshot)
    }

    /// Seal the target chain with the Facilitator's current storage.
    pub fn seal_target(&mut self) -> BlockHeader {
        let mut snapshot = StateSnapshot::new();
        snapshot.insert(self.facilitator.address(), self.facilitator.storage().clone());
        self.target.seal(snapshot)
    }

    /// Approve the Vault and deposit `amount` collateral units from `user`.
    pub fn deposit(&mut self, user: Address, amount: u128) -> Result<()> {
        let ctx = self.home_ctx(user);
        self.collateral.approve(&ctx, self.vault.address(), amount)?;
        self.vault.mint(&ctx, &mut self.collateral, user, amount)?;
        Ok(())
    }

    /// Approve the Facilitator and burn `amount` stable units from `user`.
    pub fn burn(&mut self, user: Address, amount: u128) -> Result<()> {
        let ctx = self.target_ctx(user);
        self.stable.approve(&ctx, self.facilitator.address(), amount)?;
        let asset = self.collateral.address();
        self.facilitator
            .burn_and_release_collateral(&ctx, &mut self.stable, asset, user, amount)?;
        Ok(())
    }
}
