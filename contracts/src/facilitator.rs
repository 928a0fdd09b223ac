//! # Facilitator (target chain)
//!
//! Mints the stable asset against Vault authorizations and burns it to
//! start a collateral release. It never touches collateral: all it does on
//! the way out is write a [`BurnCommitment`] the Vault can prove.
//!
//! ## Authorization Model
//!
//! `mint` is callable by anyone. A caller must present a proof that the
//! Vault's storage on the home chain holds the [`MintAuthorization`] digest
//! for `(nonce, recipient, amount)`. The nonce is then consumed, so every
//! authorization mints exactly once no matter how many relayers race to
//! deliver it or how late they arrive.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crossmint_protocol::config::{COUNTERPART_SLOT, FACILITATOR_BURNS_SLOT};
use crossmint_protocol::storage::{ContractStorage, SlotKey};
use crossmint_protocol::{Address, CallContext, ChainId, ErrorKind};

use crate::binding::{BindingError, CounterpartBinding};
use crate::commitment::{address_word, commitment_slot, BurnCommitment, MintAuthorization};
use crate::stable_asset::StableAsset;
use crate::token::TokenError;
use crate::verifier::{CommitmentProof, CommitmentVerifier, VerifierError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by the Facilitator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FacilitatorError {
    /// Counterpart binding failure.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// The call executes on a chain other than the Facilitator's.
    #[error("wrong chain: facilitator lives on {expected}, call executed on {actual}")]
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

    /// The stable asset handed in is not the one this Facilitator issues.
    #[error("wrong stable asset: expected {expected}, got {found}")]
    WrongStableAsset {
        /// Configured asset.
        expected: Address,
        /// Asset passed in.
        found: Address,
    },

    /// Amount must be non-zero.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Recipient, user or collateral asset is the zero address.
    #[error("zero address")]
    ZeroAddress,

    /// The authorization nonce was already minted.
    #[error("authorization {nonce} already consumed")]
    ReplayedAuthorization {
        /// Authorization nonce.
        nonce: u64,
    },

    /// The mint authorization did not verify.
    #[error("commitment mismatch for authorization {nonce}: {source}")]
    CommitmentMismatch {
        /// Authorization nonce.
        nonce: u64,
        /// Verifier rejection.
        #[source]
        source: VerifierError,
    },

    /// A stable asset operation failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Accounting overflowed.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
}

impl FacilitatorError {
    /// Coarse classification for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FacilitatorError::Binding(e) => e.kind(),
            FacilitatorError::Token(e) => e.kind(),
            FacilitatorError::WrongChain { .. }
            | FacilitatorError::InvalidChainPair { .. }
            | FacilitatorError::WrongStableAsset { .. } => ErrorKind::Configuration,
            FacilitatorError::ZeroAmount | FacilitatorError::ZeroAddress => ErrorKind::InvalidInput,
            FacilitatorError::ReplayedAuthorization { .. } => ErrorKind::Replay,
            FacilitatorError::CommitmentMismatch { .. } => ErrorKind::Verification,
            FacilitatorError::ArithmeticOverflow => ErrorKind::Arithmetic,
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Deployment parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilitatorParams {
    /// The stable asset this Facilitator mints.
    pub stable_asset: Address,
    /// Chain the Facilitator is deployed on.
    pub chain_id: ChainId,
    /// Chain the Vault is deployed on.
    pub target_chain_id: ChainId,
    /// Position of the Vault's authorization mapping in its storage.
    pub commitment_slot: u64,
    /// Vault address, if known at deployment.
    pub counterpart: Option<Address>,
}

/// Events emitted by the Facilitator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacilitatorEvent {
    /// Counterpart bound.
    AccountSet {
        /// Vault address.
        counterpart: Address,
    },
    /// Stable asset minted against an authorization.
    Minted {
        /// Authorization nonce consumed.
        nonce: u64,
        /// Account credited.
        recipient: Address,
        /// Stable units minted.
        amount: u128,
    },
    /// Stable asset burned and commitment written.
    BurnCommitted {
        /// Burn nonce.
        nonce: u64,
        /// Account whose collateral should be released.
        user: Address,
        /// Collateral token to release from.
        collateral_asset: Address,
        /// Stable units burned.
        amount: u128,
    },
}

// ---------------------------------------------------------------------------
// Facilitator
// ---------------------------------------------------------------------------

/// The target-chain stable asset facilitator.
pub struct Facilitator {
    address: Address,
    params: FacilitatorParams,
    binding: CounterpartBinding,
    verifier: Arc<dyn CommitmentVerifier>,
    consumed: HashSet<u64>,
    next_burn_nonce: u64,
    total_minted: u128,
    storage: ContractStorage,
    events: Vec<FacilitatorEvent>,
}

impl std::fmt::Debug for Facilitator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Facilitator")
            .field("address", &self.address)
            .field("params", &self.params)
            .field("total_minted", &self.total_minted)
            .field("next_burn_nonce", &self.next_burn_nonce)
            .finish_non_exhaustive()
    }
}

impl Facilitator {
    /// Deploy a Facilitator at `address`. `ctx.caller` becomes the admin.
    pub fn new(
        address: Address,
        ctx: &CallContext,
        params: FacilitatorParams,
        verifier: Arc<dyn CommitmentVerifier>,
    ) -> Result<Self, FacilitatorError> {
        if ctx.chain_id != params.chain_id {
            return Err(FacilitatorError::WrongChain {
                expected: params.chain_id,
                actual: ctx.chain_id,
            });
        }
        if params.chain_id.0 == 0
            || params.target_chain_id.0 == 0
            || params.chain_id == params.target_chain_id
        {
            return Err(FacilitatorError::InvalidChainPair {
                chain: params.chain_id,
                target: params.target_chain_id,
            });
        }
        if address.is_zero() || params.stable_asset.is_zero() {
            return Err(FacilitatorError::ZeroAddress);
        }
        let binding = CounterpartBinding::new(ctx.caller, params.counterpart)?;

        let mut facilitator = Self {
            address,
            params,
            binding,
            verifier,
            consumed: HashSet::new(),
            next_burn_nonce: 0,
            total_minted: 0,
            storage: ContractStorage::new(),
            events: Vec::new(),
        };
        if let Some(counterpart) = facilitator.binding.current() {
            facilitator.store_counterpart(counterpart);
        }
        info!(
            facilitator = %address,
            chain = %facilitator.params.chain_id,
            target = %facilitator.params.target_chain_id,
            "facilitator deployed"
        );
        Ok(facilitator)
    }

    fn check_chain(&self, ctx: &CallContext) -> Result<(), FacilitatorError> {
        if ctx.chain_id != self.params.chain_id {
            return Err(FacilitatorError::WrongChain {
                expected: self.params.chain_id,
                actual: ctx.chain_id,
            });
        }
        Ok(())
    }

    fn check_asset(&self, stable: &StableAsset) -> Result<(), FacilitatorError> {
        if stable.address() != self.params.stable_asset {
            return Err(FacilitatorError::WrongStableAsset {
                expected: self.params.stable_asset,
                found: stable.address(),
            });
        }
        Ok(())
    }

    fn store_counterpart(&mut self, counterpart: Address) {
        self.storage
            .store(SlotKey::from_index(COUNTERPART_SLOT), address_word(&counterpart));
    }

    /// Bind the Vault address. Admin only, once.
    pub fn set_account(&mut self, ctx: &CallContext, counterpart: Address) -> Result<(), FacilitatorError> {
        self.check_chain(ctx)?;
        self.binding.set(ctx.caller, counterpart)?;
        self.store_counterpart(counterpart);
        self.events.push(FacilitatorEvent::AccountSet { counterpart });
        info!(facilitator = %self.address, %counterpart, "facilitator counterpart set");
        Ok(())
    }

    /// Mint `amount` to `recipient` under Vault authorization `nonce`.
    pub fn mint(
        &mut self,
        ctx: &CallContext,
        stable: &mut StableAsset,
        recipient: Address,
        amount: u128,
        nonce: u64,
        proof: &CommitmentProof,
    ) -> Result<(), FacilitatorError> {
        self.check_chain(ctx)?;
        let counterpart = self.binding.require()?;
        self.check_asset(stable)?;
        if self.consumed.contains(&nonce) {
            warn!(facilitator = %self.address, nonce, %recipient, "replayed authorization");
            return Err(FacilitatorError::ReplayedAuthorization { nonce });
        }
        if amount == 0 {
            return Err(FacilitatorError::ZeroAmount);
        }
        if recipient.is_zero() {
            return Err(FacilitatorError::ZeroAddress);
        }

        let expected = MintAuthorization {
            nonce,
            recipient,
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
            warn!(facilitator = %self.address, nonce, %recipient, error = %source, "mint authorization rejected");
            return Err(FacilitatorError::CommitmentMismatch { nonce, source });
        }

        let total = self
            .total_minted
            .checked_add(amount)
            .ok_or(FacilitatorError::ArithmeticOverflow)?;
        stable.mint(&ctx.with_caller(self.address), recipient, amount)?;
        self.verifier
            .record_accepted(self.params.target_chain_id, &counterpart, &slot, &digest, proof);

        self.consumed.insert(nonce);
        self.total_minted = total;
        self.events.push(FacilitatorEvent::Minted {
            nonce,
            recipient,
            amount,
        });
        info!(facilitator = %self.address, nonce, %recipient, amount, "stable asset minted");
        Ok(())
    }

    /// Burn `amount` of `ctx.caller`'s stable asset and commit a release of
    /// `user`'s `collateral_asset` on the home chain.
    ///
    /// The caller must have approved the Facilitator for at least `amount`.
    pub fn burn_and_release_collateral(
        &mut self,
        ctx: &CallContext,
        stable: &mut StableAsset,
        collateral_asset: Address,
        user: Address,
        amount: u128,
    ) -> Result<BurnCommitment, FacilitatorError> {
        self.check_chain(ctx)?;
        self.binding.require()?;
        self.check_asset(stable)?;
        if amount == 0 {
            return Err(FacilitatorError::ZeroAmount);
        }
        if user.is_zero() || collateral_asset.is_zero() {
            return Err(FacilitatorError::ZeroAddress);
        }
        let nonce = self.next_burn_nonce;
        let next_nonce = nonce
            .checked_add(1)
            .ok_or(FacilitatorError::ArithmeticOverflow)?;

        stable.burn_from(&ctx.with_caller(self.address), ctx.caller, amount)?;

        let commitment = BurnCommitment {
            nonce,
            user,
            collateral_asset,
            amount,
            source_chain: self.params.chain_id,
        };
        self.storage.store(
            commitment_slot(FACILITATOR_BURNS_SLOT, nonce),
            commitment.digest(),
        );
        self.next_burn_nonce = next_nonce;
        // Every unit in circulation was minted here, so a successful burn
        // never exceeds the running total.
        self.total_minted = self.total_minted.saturating_sub(amount);
        self.events.push(FacilitatorEvent::BurnCommitted {
            nonce,
            user,
            collateral_asset,
            amount,
        });
        info!(
            facilitator = %self.address,
            nonce,
            burner = %ctx.caller,
            %user,
            asset = %collateral_asset,
            amount,
            "burn committed"
        );
        Ok(commitment)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Contract address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Deployment parameters.
    pub fn params(&self) -> &FacilitatorParams {
        &self.params
    }

    /// Bound Vault, if any.
    pub fn counterpart(&self) -> Option<Address> {
        self.binding.current()
    }

    /// Whether authorization `nonce` was already minted.
    pub fn is_consumed(&self, nonce: u64) -> bool {
        self.consumed.contains(&nonce)
    }

    /// Nonce the next burn will carry.
    pub fn burn_nonce(&self) -> u64 {
        self.next_burn_nonce
    }

    /// Stable units minted and not yet burned.
    pub fn total_minted(&self) -> u128 {
        self.total_minted
    }

    /// The Facilitator's contract storage.
    pub fn storage(&self) -> &ContractStorage {
        &self.storage
    }

    /// Events emitted so far.
    pub fn events(&self) -> &[FacilitatorEvent] {
        &self.events
    }

    /// Drain the event log.
    pub fn take_events(&mut self) -> Vec<FacilitatorEvent> {
        std::mem::take(&mut self.events)
    }
}
