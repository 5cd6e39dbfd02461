//! Domain Error Types
//!
//! Pure business-rule errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::money::AmountError;

/// Business rule violations and domain invariant failures.
///
/// These are independent of the web/infrastructure layer. Every variant is
/// detected before any mutation, so a caller observing one of these can rely
/// on balances and schedules being untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Credit not found
    #[error("Credit not found: {0}")]
    CreditNotFound(Uuid),

    /// Payment not found
    #[error("Payment not found: {0}")]
    PaymentNotFound(Uuid),

    /// Transfer not found
    #[error("Transfer not found: {0}")]
    TransferNotFound(Uuid),

    /// Invalid amount (zero, negative, malformed, or exceeds limits)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Transfer between accounts held in different currencies
    #[error("Currency mismatch: {from} vs {to}")]
    CurrencyMismatch { from: String, to: String },

    /// Transfer to the same account
    #[error("Cannot transfer to the same account")]
    SameAccountTransfer,

    /// Insufficient funds on the source account
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    /// Payment below the configured minimum
    #[error("Payment amount is too small: minimum {minimum}, got {amount}")]
    PaymentTooSmall { minimum: Decimal, amount: Decimal },

    /// Payment larger than the remaining principal
    #[error("Payment exceeds credit balance: remaining {remaining}, got {amount}")]
    PaymentExceedsBalance { remaining: Decimal, amount: Decimal },

    /// Credit has no remaining principal to pay against
    #[error("Credit is already paid off: {0}")]
    CreditAlreadySettled(Uuid),
}

impl DomainError {
    /// Check if this is a missing-entity error (maps to 404)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::AccountNotFound(_)
                | Self::CreditNotFound(_)
                | Self::PaymentNotFound(_)
                | Self::TransferNotFound(_)
        )
    }

    /// Check if this is a validation error (user's fault, maps to 400)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_)
                | Self::CurrencyMismatch { .. }
                | Self::SameAccountTransfer
                | Self::InsufficientFunds { .. }
                | Self::PaymentTooSmall { .. }
                | Self::PaymentExceedsBalance { .. }
        )
    }
}

impl From<AmountError> for DomainError {
    fn from(err: AmountError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}
