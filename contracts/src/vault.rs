//! # Vault (home chain)
//!
//! Custodies collateral, prices it, authorizes stable-asset mints on the
//! target chain and releases collateral once the target chain proves the
//! stable asset was burned.
//!
//! ## Lifecycle
//!
//! ```text
//!  user ──mint(token, recipient, amount)──▶ Vault
//!                                            │ pull collateral, grow position
//!                                            │ write MintAuthorization digest
//!                                            ▼
//!                                     AuthorizedMint ──relay──▶ Facilitator.mint
//!
//!  Facilitator.burn ──BurnCommitted──relay──▶ verify_burn_and_release_collateral
//!                                            │ proof via CommitmentVerifier
//!                                            │ shrink position, consume nonce
//!                                            ▼
//!                                     collateral back to user
//! ```
//!
//! ## Valuation
//!
//! ```text
//! authorized = floor(amount × p_c × ratio × 10^max(0, d_s − d_c)
//!                    / (p_s × 10_000 × 10^max(0, d_c − d_s)))
//! ```
//!
//! One division, one round-down. Releases are proportional to the position:
//! burning `b` of `minted` returns `floor(b × collateral / minted)`, so a
//! full burn returns exactly what was deposited whatever the price did in
//! between.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crossmint_protocol::config::{
    BPS_DENOMINATOR, COUNTERPART_SLOT, STABLE_ASSET_DECIMALS, VAULT_AUTHORIZATIONS_SLOT,
};
use crossmint_protocol::math::mul_div;
use crossmint_protocol::storage::{ContractStorage, SlotKey};
use crossmint_protocol::{Address, CallContext, ChainId, ErrorKind};

use crate::binding::{BindingError, CounterpartBinding};
use crate::commitment::{address_word, commitment_slot, BurnCommitment, MintAuthorization};
use crate::oracle::{OracleError, PriceSource};
use crate::token::{CollateralToken, TokenError};
use crate::verifier::{CommitmentProof, CommitmentVerifier, VerifierError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by the Vault.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Counterpart binding failure.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// The call executes on a chain other than the Vault's.
    #[error("wrong chain: vault lives on {expected}, call executed on {actual}")]
    WrongChain {
        /// Recorded chain id.
        expected: ChainId,
        /// Live chain id.
        actual: ChainId,
    },

    /// Home and target chain ids must be non-zero and distinct.
    #[error("invalid chain pair: {chain} -> {target}")]
    InvalidChainPair {
        /// Chain the contract lives on.
        chain: ChainId,
        /// Chain its counterpart lives on.
        target: ChainId,
    },

    /// Mint ratio outside `1..=10_000` bps.
    #[error("mint ratio {0} bps out of range")]
    InvalidMintRatio(u32),

    /// Amount must be non-zero.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Recipient, user or asset is the zero address.
    #[error("zero address")]
    ZeroAddress,

    /// Price lookup failed.
    #[error(transparent)]
    Price(#[from] OracleError),

    /// The authorization rounds down to zero stable units.
    #[error("deposit of {amount} authorizes nothing")]
    MintTooSmall {
        /// Collateral offered.
        amount: u128,
    },

    /// Valuation or accounting overflowed.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// Pulling collateral from the caller failed.
    #[error("insufficient collateral: {0}")]
    InsufficientCollateral(#[source] TokenError),

    /// Returning collateral to the user failed. Nothing was released.
    #[error("collateral transfer failed: {0}")]
    TransferFailed(#[source] TokenError),

    /// The burn commitment was already consumed.
    #[error("burn {nonce} already released")]
    AlreadyReleased {
        /// Burn nonce.
        nonce: u64,
    },

    /// The burn commitment did not verify.
    #[error("commitment mismatch for burn {nonce}: {source}")]
    CommitmentMismatch {
        /// Burn nonce.
        nonce: u64,
        /// Verifier rejection.
        #[source]
        source: VerifierError,
    },

    /// The burn exceeds what the position has outstanding.
    #[error("release exceeds deposit: burn of {requested} against {outstanding} outstanding")]
    ReleaseExceedsDeposit {
        /// Stable units burned.
        requested: u128,
        /// Stable units outstanding on the position.
        outstanding: u128,
    },
}

impl VaultError {
    /// Coarse classification for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::Binding(e) => e.kind(),
            VaultError::Price(e) => e.kind(),
            VaultError::WrongChain { .. } | VaultError::InvalidChainPair { .. } => {
                ErrorKind::Configuration
            }
            VaultError::InvalidMintRatio(_)
            | VaultError::ZeroAmount
            | VaultError::ZeroAddress
            | VaultError::MintTooSmall { .. }
            | VaultError::ReleaseExceedsDeposit { .. } => ErrorKind::InvalidInput,
            VaultError::ArithmeticOverflow => ErrorKind::Arithmetic,
            VaultError::InsufficientCollateral(_) | VaultError::TransferFailed(_) => {
                ErrorKind::InsufficientFunds
            }
            VaultError::AlreadyReleased { .. } => ErrorKind::Replay,
            VaultError::CommitmentMismatch { .. } => ErrorKind::Verification,
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Deployment parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultParams {
    /// Stable asset address on the target chain (oracle key for its price).
    pub stable_asset: Address,
    /// Chain the Vault is deployed on.
    pub chain_id: ChainId,
    /// Chain the Facilitator is deployed on.
    pub target_chain_id: ChainId,
    /// Position of the Facilitator's burn mapping in its storage.
    pub commitment_slot: u64,
    /// Stable value authorized per unit of collateral value, in bps.
    pub mint_ratio_bps: u32,
    /// Facilitator address, if known at deployment.
    pub counterpart: Option<Address>,
}

/// Collateral held for one `(user, asset)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralPosition {
    /// Collateral units held.
    pub collateral: u128,
    /// Stable units authorized and not yet burned back.
    pub minted: u128,
}

/// Events emitted by the Vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    /// Counterpart bound.
    AccountSet {
        /// Facilitator address.
        counterpart: Address,
    },
    /// A mint authorization was written.
    AuthorizedMint {
        /// Authorization nonce.
        nonce: u64,
        /// Account to credit on the target chain.
        recipient: Address,
        /// Stable units authorized.
        amount: u128,
        /// Collateral token deposited.
        collateral_asset: Address,
        /// Collateral units deposited.
        collateral_amount: u128,
    },
    /// Collateral returned after a verified burn.
    CollateralReleased {
        /// Burn nonce consumed.
        nonce: u64,
        /// Account receiving collateral.
        user: Address,
        /// Collateral token released.
        collateral_asset: Address,
        /// Collateral units released.
        amount: u128,
    },
}

/// Stable units authorized for `amount` collateral units.
///
/// Returns `None` on overflow. See the module docs for the formula.
pub fn authorization_amount(
    amount: u128,
    collateral_price: u128,
    stable_price: u128,
    collateral_decimals: u8,
    stable_decimals: u8,
    mint_ratio_bps: u32,
) -> Option<u128> {
    let up = 10u128.checked_pow(u32::from(stable_decimals.saturating_sub(collateral_decimals)))?;
    let down = 10u128.checked_pow(u32::from(collateral_decimals.saturating_sub(stable_decimals)))?;

    let scale = collateral_price
        .checked_mul(u128::from(mint_ratio_bps))?
        .checked_mul(up)?;
    let denominator = stable_price.checked_mul(BPS_DENOMINATOR)?.checked_mul(down)?;
    mul_div(amount, scale, denominator)
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// The home-chain collateral vault.
pub struct Vault {
    address: Address,
    params: VaultParams,
    binding: CounterpartBinding,
    oracle: Arc<dyn PriceSource>,
    verifier: Arc<dyn CommitmentVerifier>,
    /// `(user, collateral_asset) -> position`.
    positions: HashMap<(Address, Address), CollateralPosition>,
    next_nonce: u64,
    released: HashSet<u64>,
    storage: ContractStorage,
    events: Vec<VaultEvent>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("address", &self.address)
            .field("params", &self.params)
            .field("positions", &self.positions.len())
            .field("next_nonce", &self.next_nonce)
            .finish_non_exhaustive()
    }
}

impl Vault {
    /// Deploy a Vault at `address`. `ctx.caller` becomes the admin.
    pub fn new(
        address: Address,
        ctx: &CallContext,
        params: VaultParams,
        oracle: Arc<dyn PriceSource>,
        verifier: Arc<dyn CommitmentVerifier>,
    ) -> Result<Self, VaultError> {
        if ctx.chain_id != params.chain_id {
            return Err(VaultError::WrongChain {
                expected: params.chain_id,
                actual: ctx.chain_id,
            });
        }
        if params.chain_id.0 == 0
            || params.target_chain_id.0 == 0
            || params.chain_id == params.target_chain_id
        {
            return Err(VaultError::InvalidChainPair {
                chain: params.chain_id,
                target: params.target_chain_id,
            });
        }
        if params.mint_ratio_bps == 0 || u128::from(params.mint_ratio_bps) > BPS_DENOMINATOR {
            return Err(VaultError::InvalidMintRatio(params.mint_ratio_bps));
        }
        if address.is_zero() || params.stable_asset.is_zero() {
            return Err(VaultError::ZeroAddress);
        }
        let binding = CounterpartBinding::new(ctx.caller, params.counterpart)?;

        let mut vault = Self {
            address,
            params,
            binding,
            oracle,
            verifier,
            positions: HashMap::new(),
            next_nonce: 0,
            released: HashSet::new(),
            storage: ContractStorage::new(),
            events: Vec::new(),
        };
        if let Some(counterpart) = vault.binding.current() {
            vault.store_counterpart(counterpart);
        }
        info!(
            vault = %address,
            chain = %vault.params.chain_id,
            target = %vault.params.target_chain_id,
            ratio_bps = vault.params.mint_ratio_bps,
            "vault deployed"
        );
        Ok(vault)
    }

    fn check_chain(&self, ctx: &CallContext) -> Result<(), VaultError> {
        if ctx.chain_id != self.params.chain_id {
            return Err(VaultError::WrongChain {
                expected: self.params.chain_id,
                actual: ctx.chain_id,
            });
        }
        Ok(())
    }

    fn store_counterpart(&mut self, counterpart: Address) {
        self.storage
            .store(SlotKey::from_index(COUNTERPART_SLOT), address_word(&counterpart));
    }

    /// Bind the Facilitator address. Admin only, once.
    pub fn set_account(&mut self, ctx: &CallContext, counterpart: Address) -> Result<(), VaultError> {
        self.check_chain(ctx)?;
        self.binding.set(ctx.caller, counterpart)?;
        self.store_counterpart(counterpart);
        self.events.push(VaultEvent::AccountSet { counterpart });
        info!(vault = %self.address, %counterpart, "vault counterpart set");
        Ok(())
    }

    /// Deposit `amount` of `token` from `ctx.caller` and authorize a mint to
    /// `recipient` on the target chain.
    ///
    /// The caller must have approved the Vault for at least `amount`.
    pub fn mint(
        &mut self,
        ctx: &CallContext,
        token: &mut dyn CollateralToken,
        recipient: Address,
        amount: u128,
    ) -> Result<MintAuthorization, VaultError> {
        self.check_chain(ctx)?;
        self.binding.require()?;
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if recipient.is_zero() {
            return Err(VaultError::ZeroAddress);
        }

        let asset = token.address();
        let collateral_price = self.oracle.asset_price(&asset)?;
        let stable_price = self.oracle.asset_price(&self.params.stable_asset)?;
        let authorized = authorization_amount(
            amount,
            collateral_price,
            stable_price,
            token.decimals(),
            STABLE_ASSET_DECIMALS,
            self.params.mint_ratio_bps,
        )
        .ok_or(VaultError::ArithmeticOverflow)?;
        if authorized == 0 {
            return Err(VaultError::MintTooSmall { amount });
        }

        let current = self.position(&recipient, &asset).unwrap_or_default();
        let updated = CollateralPosition {
            collateral: current
                .collateral
                .checked_add(amount)
                .ok_or(VaultError::ArithmeticOverflow)?,
            minted: current
                .minted
                .checked_add(authorized)
                .ok_or(VaultError::ArithmeticOverflow)?,
        };
        let nonce = self.next_nonce;
        let next_nonce = nonce.checked_add(1).ok_or(VaultError::ArithmeticOverflow)?;

        token
            .transfer_from(&ctx.with_caller(self.address), ctx.caller, self.address, amount)
            .map_err(VaultError::InsufficientCollateral)?;

        let authorization = MintAuthorization {
            nonce,
            recipient,
            amount: authorized,
            source_chain: self.params.chain_id,
        };
        self.positions.insert((recipient, asset), updated);
        self.next_nonce = next_nonce;
        self.storage.store(
            commitment_slot(VAULT_AUTHORIZATIONS_SLOT, nonce),
            authorization.digest(),
        );
        self.events.push(VaultEvent::AuthorizedMint {
            nonce,
            recipient,
            amount: authorized,
            collateral_asset: asset,
            collateral_amount: amount,
        });
        info!(
            vault = %self.address,
            nonce,
            depositor = %ctx.caller,
            %recipient,
            %asset,
            collateral = amount,
            authorized,
            "mint authorized"
        );
        Ok(authorization)
    }

    /// Release collateral for burn `nonce` once `proof` shows the
    /// Facilitator committed `(user, token, amount)` under that nonce.
    ///
    /// Callable by anyone. Returns the collateral units released.
    pub fn verify_burn_and_release_collateral(
        &mut self,
        ctx: &CallContext,
        token: &mut dyn CollateralToken,
        user: Address,
        amount: u128,
        nonce: u64,
        proof: &CommitmentProof,
    ) -> Result<u128, VaultError> {
        self.check_chain(ctx)?;
        let counterpart = self.binding.require()?;
        if self.released.contains(&nonce) {
            warn!(vault = %self.address, nonce, %user, "burn already released");
            return Err(VaultError::AlreadyReleased { nonce });
        }
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if user.is_zero() {
            return Err(VaultError::ZeroAddress);
        }

        let asset = token.address();
        let expected = BurnCommitment {
            nonce,
            user,
            collateral_asset: asset,
            amount,
            source_chain: self.params.target_chain_id,
        };
        let slot = commitment_slot(self.params.commitment_slot, nonce);
        let digest = expected.digest();
        if let Err(source) = self.verifier.verify(
            self.params.target_chain_id,
            &counterpart,
            &slot,
            &digest,
            proof,
        ) {
            warn!(vault = %self.address, nonce, %user, error = %source, "burn commitment rejected");
            return Err(VaultError::CommitmentMismatch { nonce, source });
        }

        let position = self.position(&user, &asset).unwrap_or_default();
        if amount > position.minted {
            return Err(VaultError::ReleaseExceedsDeposit {
                requested: amount,
                outstanding: position.minted,
            });
        }
        let release = if amount == position.minted {
            position.collateral
        } else {
            mul_div(amount, position.collateral, position.minted)
                .ok_or(VaultError::ArithmeticOverflow)?
        };

        // Effects first; the outbound transfer runs against updated state.
        let updated = CollateralPosition {
            collateral: position.collateral - release,
            minted: position.minted - amount,
        };
        self.write_position(user, asset, updated);
        self.released.insert(nonce);

        if let Err(e) = token.transfer(&ctx.with_caller(self.address), user, release) {
            self.write_position(user, asset, position);
            self.released.remove(&nonce);
            return Err(VaultError::TransferFailed(e));
        }
        self.verifier
            .record_accepted(self.params.target_chain_id, &counterpart, &slot, &digest, proof);

        self.events.push(VaultEvent::CollateralReleased {
            nonce,
            user,
            collateral_asset: asset,
            amount: release,
        });
        info!(
            vault = %self.address,
            nonce,
            %user,
            %asset,
            burned = amount,
            released = release,
            "collateral released"
        );
        Ok(release)
    }

    fn write_position(&mut self, user: Address, asset: Address, position: CollateralPosition) {
        if position == CollateralPosition::default() {
            self.positions.remove(&(user, asset));
        } else {
            self.positions.insert((user, asset), position);
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Contract address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Deployment parameters.
    pub fn params(&self) -> &VaultParams {
        &self.params
    }

    /// Bound Facilitator, if any.
    pub fn counterpart(&self) -> Option<Address> {
        self.binding.current()
    }

    /// Position of `user` in `asset`.
    pub fn position(&self, user: &Address, asset: &Address) -> Option<CollateralPosition> {
        self.positions.get(&(*user, *asset)).copied()
    }

    /// Redeemable value of `user`'s position in `token`, in underlying units.
    pub fn collateral_value(&self, user: &Address, token: &dyn CollateralToken) -> Result<u128, VaultError> {
        let collateral = self
            .position(user, &token.address())
            .map(|p| p.collateral)
            .unwrap_or(0);
        token
            .redeemable_value(collateral)
            .map_err(|_| VaultError::ArithmeticOverflow)
    }

    /// Nonce the next authorization will carry.
    pub fn authorization_nonce(&self) -> u64 {
        self.next_nonce
    }

    /// Whether burn `nonce` was already released.
    pub fn is_released(&self, nonce: u64) -> bool {
        self.released.contains(&nonce)
    }

    /// The Vault's contract storage.
    pub fn storage(&self) -> &ContractStorage {
        &self.storage
    }

    /// Events emitted so far.
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    /// Drain the event log.
    pub fn take_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }
}
