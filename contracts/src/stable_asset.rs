//! # Stable Asset
//!
//! The asset the Facilitator issues. Its supply is controlled by exactly
//! one minter, fixed once by the deployer. Everyone else can only move or
//! approve what they already hold.

use serde::{Deserialize, Serialize};
use tracing::info;

use crossmint_protocol::{Address, CallContext};

use crate::token::{TokenError, TokenLedger};

/// A mintable, burnable stable asset with a single minter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StableAsset {
    address: Address,
    deployer: Address,
    minter: Option<Address>,
    ledger: TokenLedger,
}

impl StableAsset {
    /// Deploy the asset. `ctx.caller` becomes the deployer.
    pub fn new(address: Address, ctx: &CallContext, decimals: u8) -> Self {
        Self {
            address,
            deployer: ctx.caller,
            minter: None,
            ledger: TokenLedger::new(decimals),
        }
    }

    /// Token contract address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Decimal places.
    pub fn decimals(&self) -> u8 {
        self.ledger.decimals()
    }

    /// The minter, once set.
    pub fn minter(&self) -> Option<Address> {
        self.minter
    }

    /// Hand supply control to `minter`. Deployer only, once.
    pub fn set_minter(&mut self, ctx: &CallContext, minter: Address) -> Result<(), TokenError> {
        if ctx.caller != self.deployer {
            return Err(TokenError::Unauthorized { caller: ctx.caller });
        }
        if let Some(existing) = self.minter {
            return Err(TokenError::MinterAlreadySet(existing));
        }
        if minter.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        self.minter = Some(minter);
        info!(asset = %self.address, %minter, "stable asset minter set");
        Ok(())
    }

    /// Issue `amount` to `to`. Minter only.
    pub fn mint(&mut self, ctx: &CallContext, to: Address, amount: u128) -> Result<(), TokenError> {
        self.only_minter(ctx)?;
        self.ledger.mint(to, amount)
    }

    /// Destroy `amount` of `from`'s balance using the minter's allowance.
    pub fn burn_from(&mut self, ctx: &CallContext, from: Address, amount: u128) -> Result<(), TokenError> {
        self.only_minter(ctx)?;
        self.ledger.burn_from(ctx.caller, from, amount)
    }

    /// Move `amount` from `ctx.caller` to `to`.
    pub fn transfer(&mut self, ctx: &CallContext, to: Address, amount: u128) -> Result<(), TokenError> {
        self.ledger.transfer(ctx.caller, to, amount)
    }

    /// Let `spender` move or burn up to `amount` of `ctx.caller`'s balance.
    pub fn approve(&mut self, ctx: &CallContext, spender: Address, amount: u128) -> Result<(), TokenError> {
        self.ledger.approve(ctx.caller, spender, amount)
    }

    /// Balance of `account`.
    pub fn balance_of(&self, account: &Address) -> u128 {
        self.ledger.balance_of(account)
    }

    /// Remaining allowance.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.ledger.allowance(owner, spender)
    }

    /// Units in circulation.
    pub fn total_supply(&self) -> u128 {
        self.ledger.total_supply()
    }

    fn only_minter(&self, ctx: &CallContext) -> Result<(), TokenError> {
        match self.minter {
            Some(minter) if minter == ctx.caller => Ok(()),
            _ => Err(TokenError::Unauthorized { caller: ctx.caller }),
        }
    }
}
