//! Counterpart account binding shared by the Vault and the Facilitator.
//!
//! Each side stores exactly one counterpart address. The deploying admin
//! sets it once, to a non-zero address, and every mint, burn and release
//! path refuses to run until it is set.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crossmint_protocol::{Address, ErrorKind};

/// Errors from binding or reading the counterpart.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// Only the admin may bind the counterpart.
    #[error("unauthorized: {caller} is not the admin")]
    Unauthorized {
        /// Offending caller.
        caller: Address,
    },

    /// The counterpart cannot be the zero address.
    #[error("counterpart cannot be the zero address")]
    ZeroAddress,

    /// The counterpart was already bound.
    #[error("counterpart already set to {0}")]
    AccountAlreadySet(Address),

    /// No counterpart bound yet.
    #[error("counterpart account not set")]
    AccountNotSet,
}

impl BindingError {
    /// Coarse classification for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BindingError::Unauthorized { .. } => ErrorKind::Unauthorized,
            BindingError::ZeroAddress => ErrorKind::InvalidInput,
            BindingError::AccountAlreadySet(_) | BindingError::AccountNotSet => {
                ErrorKind::Configuration
            }
        }
    }
}

/// One-time counterpart binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartBinding {
    admin: Address,
    counterpart: Option<Address>,
}

impl CounterpartBinding {
    /// New binding administered by `admin`, optionally bound at deployment.
    pub fn new(admin: Address, initial: Option<Address>) -> Result<Self, BindingError> {
        if initial.is_some_and(|a| a.is_zero()) {
            return Err(BindingError::ZeroAddress);
        }
        Ok(Self {
            admin,
            counterpart: initial,
        })
    }

    /// The binding admin.
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Bind `counterpart`. Admin only, non-zero, once.
    pub fn set(&mut self, caller: Address, counterpart: Address) -> Result<(), BindingError> {
        if caller != self.admin {
            return Err(BindingError::Unauthorized { caller });
        }
        if let Some(existing) = self.counterpart {
            return Err(BindingError::AccountAlreadySet(existing));
        }
        if counterpart.is_zero() {
            return Err(BindingError::ZeroAddress);
        }
        self.counterpart = Some(counterpart);
        Ok(())
    }

    /// The bound counterpart, or [`BindingError::AccountNotSet`].
    pub fn require(&self) -> Result<Address, BindingError> {
        self.counterpart.ok_or(BindingError::AccountNotSet)
    }

    /// The bound counterpart, if any.
    pub fn current(&self) -> Option<Address> {
        self.counterpart
    }
}
