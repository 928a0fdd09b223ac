//! # Price Oracle
//!
//! A per-asset price table, last write wins, no history. Prices carry
//! [`PRICE_DECIMALS`](crossmint_protocol::config::PRICE_DECIMALS) decimals
//! in a common quote currency.
//!
//! The Vault does not hold a `PriceOracle`; it holds an
//! `Arc<dyn PriceSource>`. Tests hand it a table, a deployment hands it
//! whatever adapter fronts the real feed.

use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

use crossmint_protocol::{Address, CallContext, ErrorKind};

/// Errors from price lookups and updates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// No price has been set for the asset.
    #[error("no price available for asset {0}")]
    PriceUnavailable(Address),

    /// Only the oracle admin may set prices.
    #[error("unauthorized price update from {caller}")]
    Unauthorized {
        /// Offending caller.
        caller: Address,
    },

    /// A zero price would value collateral at nothing and divide by zero
    /// when pricing the stable asset.
    #[error("price for {0} must be non-zero")]
    ZeroPrice(Address),
}

impl OracleError {
    /// Coarse classification for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OracleError::PriceUnavailable(_) => ErrorKind::PriceUnavailable,
            OracleError::Unauthorized { .. } => ErrorKind::Unauthorized,
            OracleError::ZeroPrice(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Read-only price lookup.
pub trait PriceSource: Send + Sync {
    /// Price of `asset`, scaled by `10^PRICE_DECIMALS`.
    fn asset_price(&self, asset: &Address) -> Result<u128, OracleError>;
}

/// Administrator-maintained price table.
#[derive(Debug)]
pub struct PriceOracle {
    admin: Address,
    prices: RwLock<HashMap<Address, u128>>,
}

impl PriceOracle {
    /// Deploy an empty oracle. `ctx.caller` becomes the admin.
    pub fn new(ctx: &CallContext) -> Self {
        Self {
            admin: ctx.caller,
            prices: RwLock::new(HashMap::new()),
        }
    }

    /// The account allowed to set prices.
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Overwrite the price of `asset`. Admin only.
    pub fn set_asset_price(&self, ctx: &CallContext, asset: Address, price: u128) -> Result<(), OracleError> {
        if ctx.caller != self.admin {
            return Err(OracleError::Unauthorized { caller: ctx.caller });
        }
        if price == 0 {
            return Err(OracleError::ZeroPrice(asset));
        }
        self.prices.write().insert(asset, price);
        info!(%asset, price, "asset price set");
        Ok(())
    }

    /// Current price of `asset`.
    pub fn get_asset_price(&self, asset: &Address) -> Result<u128, OracleError> {
        let price = self
            .prices
            .read()
            .get(asset)
            .copied()
            .ok_or(OracleError::PriceUnavailable(*asset))?;
        debug!(%asset, price, "asset price lookup");
        Ok(price)
    }
}

impl PriceSource for PriceOracle {
    fn asset_price(&self, asset: &Address) -> Result<u128, OracleError> {
        self.get_asset_price(asset)
    }
}
