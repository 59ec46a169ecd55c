//! Violation errors and handling strategies.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur when enforcing processor limits
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ViolationError {
    #[error("Transaction amount {amount} exceeds the maximum of {limit}")]
    TransactionLimitExceeded { limit: Decimal, amount: Decimal },

    #[error("Transaction would bring the daily volume to {projected}, above the limit of {limit}")]
    DailyLimitExceeded { limit: Decimal, projected: Decimal },

    #[error("{count} transactions in the last hour exceeds the maximum of {max}")]
    VelocityExceeded { max: usize, count: usize },

    #[error("Amount {amount} is at least {factor}x the recent average of {average}")]
    AmountSpike {
        amount: Decimal,
        average: Decimal,
        factor: Decimal,
    },

    #[error("Custom check failed: {message}")]
    CustomCheckFailed { message: String },
}

impl ViolationError {
    /// Pattern-based violations, as opposed to plain limit breaches.
    pub fn is_suspicious(&self) -> bool {
        matches!(self, Self::VelocityExceeded { .. } | Self::AmountSpike { .. })
    }
}

/// What to do when a suspicious pattern is detected.
///
/// Limit breaches always reject the payment; the strategy only decides
/// what happens to the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViolationStrategy {
    /// Reject the payment, leave the processor usable
    Reject,

    /// Reject the payment and lock the processor until unlocked
    #[default]
    LockProcessor,

    /// Continue but log warning
    IgnoreAndLog,
}
