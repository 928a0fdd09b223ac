//! # Token Ledger & Collateral Adapter
//!
//! [`TokenLedger`] is the ERC-20 bookkeeping every token in crossmint sits
//! on: balances, allowances and total supply, with checked arithmetic on
//! every mutation. It knows nothing about callers; the token types wrapping
//! it decide who may do what.
//!
//! [`CollateralToken`] is the adapter the Vault sees. The Vault never needs
//! to know how a lending pool grows its deposits, only how many units a
//! user holds and what they are worth when redeemed. [`YieldBearingToken`]
//! is the aToken-style implementation used on devnets and in tests.
//!
//! ## Security Model
//!
//! - **No partial updates**: every operation validates first and writes
//!   last. A failed transfer leaves both balances untouched.
//! - **Allowances are consumed exactly**: `transfer_from` and `burn_from`
//!   decrement the allowance by the amount moved.
//! - **Exchange rate only grows**: a yield-bearing token that could shrink
//!   would let the Vault release less than it was handed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crossmint_protocol::config::RAY;
use crossmint_protocol::math::mul_div;
use crossmint_protocol::{Address, CallContext, ErrorKind};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by token operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The account holds less than the amount requested.
    #[error("insufficient balance: {account} holds {balance}, needs {needed}")]
    InsufficientBalance {
        /// Account being debited.
        account: Address,
        /// Its current balance.
        balance: u128,
        /// Amount requested.
        needed: u128,
    },

    /// The spender's allowance is smaller than the amount requested.
    #[error("insufficient allowance: {spender} may move {allowance} of {owner}'s tokens, needs {needed}")]
    InsufficientAllowance {
        /// Token owner.
        owner: Address,
        /// Account spending on the owner's behalf.
        spender: Address,
        /// Remaining allowance.
        allowance: u128,
        /// Amount requested.
        needed: u128,
    },

    /// Minting would overflow the total supply.
    #[error("supply overflow: minting {amount} would exceed u128::MAX")]
    SupplyOverflow {
        /// Amount attempted.
        amount: u128,
    },

    /// A value computation overflowed.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// Tokens cannot be sent to or minted for the zero address.
    #[error("zero address")]
    ZeroAddress,

    /// The caller lacks the role this operation requires.
    #[error("unauthorized caller: {caller}")]
    Unauthorized {
        /// Offending caller.
        caller: Address,
    },

    /// The minter can only be set once.
    #[error("minter already set to {0}")]
    MinterAlreadySet(Address),

    /// The exchange rate of a yield-bearing token cannot decrease.
    #[error("exchange rate cannot decrease from {current} to {proposed}")]
    RateDecrease {
        /// Current rate (ray).
        current: u128,
        /// Rejected rate (ray).
        proposed: u128,
    },
}

impl TokenError {
    /// Coarse classification for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TokenError::InsufficientBalance { .. } | TokenError::InsufficientAllowance { .. } => {
                ErrorKind::InsufficientFunds
            }
            TokenError::SupplyOverflow { .. } | TokenError::ArithmeticOverflow => {
                ErrorKind::Arithmetic
            }
            TokenError::ZeroAddress | TokenError::RateDecrease { .. } => ErrorKind::InvalidInput,
            TokenError::Unauthorized { .. } => ErrorKind::Unauthorized,
            TokenError::MinterAlreadySet(_) => ErrorKind::Configuration,
        }
    }
}

// ---------------------------------------------------------------------------
// TokenLedger
// ---------------------------------------------------------------------------

/// ERC-20 style balance and allowance bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenLedger {
    decimals: u8,
    total_supply: u128,
    balances: HashMap<Address, u128>,
    /// `owner -> (spender -> allowance)`.
    allowances: HashMap<Address, HashMap<Address, u128>>,
}

impl TokenLedger {
    /// Create an empty ledger.
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals,
            ..Self::default()
        }
    }

    /// Decimal places of the token.
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Total units in circulation.
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Balance of `account` (zero if never credited).
    pub fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Remaining amount `spender` may move on behalf of `owner`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Set `spender`'s allowance over `owner`'s tokens, replacing any
    /// previous value.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: u128) -> Result<(), TokenError> {
        if spender.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        self.allowances.entry(owner).or_default().insert(spender, amount);
        Ok(())
    }

    /// Move `amount` from `from` to `to`.
    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let from_balance = self.balance_of(&from);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                account: from,
                balance: from_balance,
                needed: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        // Supply bounds every balance, so the credit cannot overflow.
        let to_balance = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(TokenError::ArithmeticOverflow)?;

        self.set_balance(from, from_balance - amount);
        self.set_balance(to, to_balance);
        Ok(())
    }

    /// Move `amount` from `from` to `to` using `spender`'s allowance.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let remaining = self.check_allowance(from, spender, amount)?;
        self.transfer(from, to, amount)?;
        self.allowances.entry(from).or_default().insert(spender, remaining);
        Ok(())
    }

    /// Create `amount` new units for `to`.
    pub fn mint(&mut self, to: Address, amount: u128) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow { amount })?;
        let balance = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow { amount })?;

        self.total_supply = supply;
        self.set_balance(to, balance);
        Ok(())
    }

    /// Destroy `amount` of `from`'s units.
    pub fn burn(&mut self, from: Address, amount: u128) -> Result<(), TokenError> {
        let balance = self.balance_of(&from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                account: from,
                balance,
                needed: amount,
            });
        }
        self.set_balance(from, balance - amount);
        self.total_supply -= amount;
        Ok(())
    }

    /// Destroy `amount` of `from`'s units using `spender`'s allowance.
    pub fn burn_from(&mut self, spender: Address, from: Address, amount: u128) -> Result<(), TokenError> {
        let remaining = self.check_allowance(from, spender, amount)?;
        self.burn(from, amount)?;
        self.allowances.entry(from).or_default().insert(spender, remaining);
        Ok(())
    }

    fn check_allowance(&self, owner: Address, spender: Address, amount: u128) -> Result<u128, TokenError> {
        let allowance = self.allowance(&owner, &spender);
        allowance
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientAllowance {
                owner,
                spender,
                allowance,
                needed: amount,
            })
    }

    fn set_balance(&mut self, account: Address, balance: u128) {
        if balance == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }
}

// ---------------------------------------------------------------------------
// Collateral Token Adapter
// ---------------------------------------------------------------------------

/// What the Vault needs from a collateral asset.
///
/// `ctx.caller` is the account moving tokens, the way `msg.sender` is for
/// an ERC-20 call. When the Vault pulls or returns collateral it calls with
/// its own address as the caller.
pub trait CollateralToken {
    /// Token contract address. Also the oracle key for its price.
    fn address(&self) -> Address;

    /// Decimal places of the token.
    fn decimals(&self) -> u8;

    /// Units held by `account`.
    fn balance_of(&self, account: &Address) -> u128;

    /// Move `amount` from `ctx.caller` to `to`.
    fn transfer(&mut self, ctx: &CallContext, to: Address, amount: u128) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to` using `ctx.caller`'s allowance.
    fn transfer_from(
        &mut self,
        ctx: &CallContext,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError>;

    /// Underlying units `amount` of this token redeem for.
    fn redeemable_value(&self, amount: u128) -> Result<u128, TokenError>;
}

/// An aToken-style yield-bearing deposit receipt.
///
/// Balances are fixed; value accrues through an exchange rate (ray, 27
/// decimals) that starts at 1.0 and only grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldBearingToken {
    address: Address,
    admin: Address,
    ledger: TokenLedger,
    exchange_rate: u128,
}

impl YieldBearingToken {
    /// Deploy a new token. The deployer becomes the pool admin.
    pub fn new(address: Address, ctx: &CallContext, decimals: u8) -> Self {
        Self {
            address,
            admin: ctx.caller,
            ledger: TokenLedger::new(decimals),
            exchange_rate: RAY,
        }
    }

    /// Credit `amount` to `to`, standing in for a lending-pool deposit.
    pub fn mint(&mut self, ctx: &CallContext, to: Address, amount: u128) -> Result<(), TokenError> {
        self.only_admin(ctx)?;
        self.ledger.mint(to, amount)
    }

    /// Let `spender` move up to `amount` of `ctx.caller`'s tokens.
    pub fn approve(&mut self, ctx: &CallContext, spender: Address, amount: u128) -> Result<(), TokenError> {
        self.ledger.approve(ctx.caller, spender, amount)
    }

    /// Remaining allowance.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.ledger.allowance(owner, spender)
    }

    /// Total units in circulation.
    pub fn total_supply(&self) -> u128 {
        self.ledger.total_supply()
    }

    /// Current exchange rate (ray).
    pub fn exchange_rate(&self) -> u128 {
        self.exchange_rate
    }

    /// Raise the exchange rate to `new_rate`.
    pub fn accrue(&mut self, ctx: &CallContext, new_rate: u128) -> Result<(), TokenError> {
        self.only_admin(ctx)?;
        if new_rate < self.exchange_rate {
            return Err(TokenError::RateDecrease {
                current: self.exchange_rate,
                proposed: new_rate,
            });
        }
        self.exchange_rate = new_rate;
        Ok(())
    }

    fn only_admin(&self, ctx: &CallContext) -> Result<(), TokenError> {
        if ctx.caller != self.admin {
            return Err(TokenError::Unauthorized { caller: ctx.caller });
        }
        Ok(())
    }
}

impl CollateralToken for YieldBearingToken {
    fn address(&self) -> Address {
        self.address
    }

    fn decimals(&self) -> u8 {
        self.ledger.decimals()
    }

    fn balance_of(&self, account: &Address) -> u128 {
        self.ledger.balance_of(account)
    }

    fn transfer(&mut self, ctx: &CallContext, to: Address, amount: u128) -> Result<(), TokenError> {
        self.ledger.transfer(ctx.caller, to, amount)
    }

    fn transfer_from(
        &mut self,
        ctx: &CallContext,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.ledger.transfer_from(ctx.caller, from, to, amount)
    }

    fn redeemable_value(&self, amount: u128) -> Result<u128, TokenError> {
        mul_div(amount, self.exchange_rate, RAY).ok_or(TokenError::ArithmeticOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossmint_protocol::ChainId;

    fn addr(label: &str) -> Address {
        Address::derive(label)
    }

    #[test]
    fn transfer_moves_balance() {
        let mut ledger = TokenLedger::new(18);
        ledger.mint(addr("alice"), 100).unwrap();
        ledger.transfer(addr("alice"), addr("bob"), 40).unwrap();
        assert_eq!(ledger.balance_of(&addr("alice")), 60);
        assert_eq!(ledger.balance_of(&addr("bob")), 40);
        assert_eq!(ledger.total_supply(), 100);
    }

    #[test]
    fn transfer_insufficient_balance_changes_nothing() {
        let mut ledger = TokenLedger::new(18);
        ledger.mint(addr("alice"), 10).unwrap();
        let err = ledger.transfer(addr("alice"), addr("bob"), 11).unwrap_err();
        assert!(matches!(err, TokenError::InsufficientBalance { balance: 10, needed: 11, .. }));
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(ledger.balance_of(&addr("alice")), 10);
        assert_eq!(ledger.balance_of(&addr("bob")), 0);
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let mut ledger = TokenLedger::new(18);
        ledger.mint(addr("alice"), 100).unwrap();
        ledger.approve(addr("alice"), addr("vault"), 70).unwrap();
        ledger
            .transfer_from(addr("vault"), addr("alice"), addr("vault"), 50)
            .unwrap();
        assert_eq!(ledger.allowance(&addr("alice"), &addr("vault")), 20);

        let err = ledger
            .transfer_from(addr("vault"), addr("alice"), addr("vault"), 21)
            .unwrap_err();
        assert!(matches!(err, TokenError::InsufficientAllowance { allowance: 20, .. }));
    }

    #[test]
    fn failed_transfer_from_keeps_allowance() {
        let mut ledger = TokenLedger::new(18);
        ledger.mint(addr("alice"), 5).unwrap();
        ledger.approve(addr("alice"), addr("vault"), 50).unwrap();
        assert!(ledger
            .transfer_from(addr("vault"), addr("alice"), addr("vault"), 10)
            .is_err());
        assert_eq!(ledger.allowance(&addr("alice"), &addr("vault")), 50);
    }

    #[test]
    fn mint_and_burn_track_supply() {
        let mut ledger = TokenLedger::new(18);
        ledger.mint(addr("alice"), 100).unwrap();
        ledger.burn(addr("alice"), 30).unwrap();
        assert_eq!(ledger.total_supply(), 70);
        assert!(ledger.burn(addr("alice"), 71).is_err());
    }

    #[test]
    fn mint_overflow_rejected() {
        let mut ledger = TokenLedger::new(18);
        ledger.mint(addr("alice"), u128::MAX).unwrap();
        let err = ledger.mint(addr("bob"), 1).unwrap_err();
        assert_eq!(err, TokenError::SupplyOverflow { amount: 1 });
        assert_eq!(ledger.balance_of(&addr("bob")), 0);
    }

    #[test]
    fn zero_address_rejected() {
        let mut ledger = TokenLedger::new(18);
        assert_eq!(ledger.mint(Address::ZERO, 1), Err(TokenError::ZeroAddress));
        ledger.mint(addr("alice"), 1).unwrap();
        assert_eq!(
            ledger.transfer(addr("alice"), Address::ZERO, 1),
            Err(TokenError::ZeroAddress)
        );
    }

    #[test]
    fn exchange_rate_only_grows() {
        let ctx = CallContext::new(addr("pool"), ChainId(1), 1);
        let mut token = YieldBearingToken::new(addr("aToken"), &ctx, 18);
        assert_eq!(token.redeemable_value(100).unwrap(), 100);

        token.accrue(&ctx, RAY + RAY / 10).unwrap();
        assert_eq!(token.redeemable_value(100).unwrap(), 110);

        let err = token.accrue(&ctx, RAY).unwrap_err();
        assert!(matches!(err, TokenError::RateDecrease { .. }));
    }

    #[test]
    fn redeemable_value_at_token_scale() {
        const E18: u128 = 1_000_000_000_000_000_000;
        let ctx = CallContext::new(addr("pool"), ChainId(1), 1);
        let mut token = YieldBearingToken::new(addr("aToken"), &ctx, 18);
        assert_eq!(token.redeemable_value(100 * E18).unwrap(), 100 * E18);
        assert_eq!(
            token.redeemable_value(1_000_000_000 * E18).unwrap(),
            1_000_000_000 * E18
        );

        token.accrue(&ctx, RAY + RAY / 20).unwrap();
        assert_eq!(token.redeemable_value(100 * E18).unwrap(), 105 * E18);
        assert_eq!(token.redeemable_value(u128::MAX), Err(TokenError::ArithmeticOverflow));
    }

    #[test]
    fn only_admin_mints_collateral() {
        let ctx = CallContext::new(addr("pool"), ChainId(1), 1);
        let mut token = YieldBearingToken::new(addr("aToken"), &ctx, 18);
        let err = token
            .mint(&ctx.with_caller(addr("mallory")), addr("mallory"), 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }
}
