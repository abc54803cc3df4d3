//! Error types for Lineage registry operations

use crate::types::{Amount, Currency};
use thiserror::Error;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur in registry, ledger and pricing operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    // === Validation ===
    /// Name exceeds the configured maximum length
    #[error("Name is {length} bytes, maximum is {max}")]
    NameTooLong { length: usize, max: usize },

    /// Payment does not match the current fee
    #[error("Fee mismatch: required {required}, provided {provided}")]
    FeeMismatch { required: Amount, provided: Amount },

    /// Fee must be positive
    #[error("Fee must be greater than zero")]
    InvalidFeeValue,

    /// Reward amount must be positive
    #[error("Reward amount must be greater than zero")]
    InvalidRewardValue,

    /// Reward would exceed the registration fee
    #[error("Reward {reward} exceeds registration fee {fee}")]
    RewardExceedsFee { reward: Amount, fee: Amount },

    /// New fee equals the current one
    #[error("Fee is already {0}")]
    FeeUnchanged(Amount),

    /// New reward amount equals the current one
    #[error("Reward amount is already {0}")]
    RewardUnchanged(Amount),

    /// Operation needs a currency the registry is not configured for
    #[error("Currency not supported by this registry: {0}")]
    UnsupportedCurrency(Currency),

    /// Caller is the account the registry collects tokens under
    #[error("The registry's own token account cannot register names")]
    SettlementAccountCaller,

    // === Conflict ===
    /// Name already has a holder
    #[error("Name already registered: {0}")]
    DuplicateName(String),

    /// Name has no holder
    #[error("Name not registered: {0}")]
    NotRegistered(String),

    /// Nothing accrued or collected
    #[error("Nothing to withdraw")]
    NothingToWithdraw,

    // === Authorization ===
    /// Caller is not the administrator
    #[error("Caller is not the administrator")]
    Unauthorized,

    // === External dependencies ===
    /// Pulling payment from the external token failed
    #[error("Token transfer of {amount} failed")]
    TransferFailed { amount: Amount },

    /// Releasing funds to the recipient failed
    #[error("Withdrawal of {amount} failed")]
    WithdrawFailed { amount: Amount },

    /// Oracle returned a price that cannot be used as a divisor
    #[error("Oracle price is invalid: {0}")]
    OraclePriceInvalid(i128),

    /// Caller holds fewer tokens than the fee
    #[error("Insufficient token balance: need {required}, have {available}")]
    InsufficientExternalBalance { required: Amount, available: Amount },

    // === Arithmetic / state ===
    /// Checked arithmetic overflowed
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    /// Restored state violates an invariant
    #[error("Corrupt state: {0}")]
    CorruptState(String),
}

/// Coarse classification of a [`RegistryError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    Authorization,
    ExternalDependency,
    State,
}

impl RegistryError {
    /// Error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NameTooLong { .. }
            | Self::FeeMismatch { .. }
            | Self::InvalidFeeValue
            | Self::InvalidRewardValue
            | Self::RewardExceedsFee { .. }
            | Self::FeeUnchanged(_)
            | Self::RewardUnchanged(_)
            | Self::UnsupportedCurrency(_)
            | Self::SettlementAccountCaller => ErrorCategory::Validation,
            Self::DuplicateName(_) | Self::NotRegistered(_) | Self::NothingToWithdraw => {
                ErrorCategory::Conflict
            }
            Self::Unauthorized => ErrorCategory::Authorization,
            Self::TransferFailed { .. }
            | Self::WithdrawFailed { .. }
            | Self::OraclePriceInvalid(_)
            | Self::InsufficientExternalBalance { .. } => ErrorCategory::ExternalDependency,
            Self::ArithmeticOverflow | Self::CorruptState(_) => ErrorCategory::State,
        }
    }

    /// Get the error code for API responses
    pub fn code(&self) -> u32 {
        match self {
            Self::NameTooLong { .. } => 1001,
            Self::FeeMismatch { .. } => 1002,
            Self::InvalidFeeValue | Self::InvalidRewardValue => 1003,
            Self::RewardExceedsFee { .. } => 1004,
            Self::FeeUnchanged(_) | Self::RewardUnchanged(_) => 1005,
            Self::UnsupportedCurrency(_) => 1006,
            Self::SettlementAccountCaller => 1007,
            Self::DuplicateName(_) => 2001,
            Self::NotRegistered(_) => 2002,
            Self::NothingToWithdraw => 2003,
            Self::Unauthorized => 3001,
            Self::TransferFailed { .. } => 4001,
            Self::WithdrawFailed { .. } => 4002,
            Self::OraclePriceInvalid(_) => 4003,
            Self::InsufficientExternalBalance { .. } => 4004,
            Self::ArithmeticOverflow => 5001,
            Self::CorruptState(_) => 5002,
        }
    }

    /// Check if the caller can succeed by retrying with corrected input or identity
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Validation | ErrorCategory::Conflict | ErrorCategory::Authorization
        ) || matches!(self, Self::InsufficientExternalBalance { .. })
    }
}
