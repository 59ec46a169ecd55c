//! Enforcement rules for processor payments using Validation.

use crate::enforcement::context::TransactionContext;
use crate::enforcement::violations::{ViolationError, ViolationStrategy};
use chrono::Duration;
use rust_decimal::Decimal;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Type alias for validation check functions
pub type ValidationCheck = Box<
    dyn for<'a> Fn(&TransactionContext<'a>) -> Validation<(), NonEmptyVec<ViolationError>>
        + Send
        + Sync,
>;

/// More than this many transactions in an hour is suspicious.
pub const DEFAULT_MAX_PER_HOUR: usize = 10;

/// An amount this many times the recent average is suspicious.
pub const DEFAULT_SPIKE_FACTOR: u32 = 5;

/// Limits and pattern checks applied before a payment is accepted.
/// Uses Validation to accumulate ALL violations.
pub struct EnforcementRules {
    pub(crate) max_transaction: Option<Decimal>,
    pub(crate) max_daily: Option<Decimal>,
    pub(crate) max_per_hour: Option<usize>,
    pub(crate) spike_factor: Option<Decimal>,
    pub(crate) required_checks: Vec<ValidationCheck>,
    pub(crate) on_violation: ViolationStrategy,
}

impl EnforcementRules {
    /// No limits, default velocity and spike detection.
    pub fn standard() -> Self {
        Self {
            max_transaction: None,
            max_daily: None,
            max_per_hour: Some(DEFAULT_MAX_PER_HOUR),
            spike_factor: Some(Decimal::from(DEFAULT_SPIKE_FACTOR)),
            required_checks: Vec::new(),
            on_violation: ViolationStrategy::default(),
        }
    }

    /// Enforce all rules, accumulating ALL violations.
    pub fn enforce(
        &self,
        context: &TransactionContext<'_>,
    ) -> Validation<(), NonEmptyVec<ViolationError>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<ViolationError>>> = Vec::new();

        if let Some(limit) = self.max_transaction {
            checks.push(if context.amount > limit {
                Validation::fail(ViolationError::TransactionLimitExceeded {
                    limit,
                    amount: context.amount,
                })
            } else {
                Validation::success(())
            });
        }

        if let Some(limit) = self.max_daily {
            let projected = context.volume_within(Duration::hours(24)) + context.amount;
            checks.push(if projected > limit {
                Validation::fail(ViolationError::DailyLimitExceeded { limit, projected })
            } else {
                Validation::success(())
            });
        }

        if let Some(max) = self.max_per_hour {
            let count = context.count_within(Duration::hours(1)) + 1;
            checks.push(if count > max {
                Validation::fail(ViolationError::VelocityExceeded { max, count })
            } else {
                Validation::success(())
            });
        }

        if let (Some(factor), Some(average)) = (self.spike_factor, context.average()) {
            checks.push(
                if average > Decimal::ZERO && context.amount >= average * factor {
                    Validation::fail(ViolationError::AmountSpike {
                        amount: context.amount,
                        average,
                        factor,
                    })
                } else {
                    Validation::success(())
                },
            );
        }

        for check_fn in &self.required_checks {
            checks.push(check_fn(context));
        }

        Validation::all_vec(checks).map(|_| ())
    }

    pub fn violation_strategy(&self) -> ViolationStrategy {
        self.on_violation
    }

    pub fn max_transaction(&self) -> Option<Decimal> {
        self.max_transaction
    }

    pub fn max_daily(&self) -> Option<Decimal> {
        self.max_daily
    }
}

impl Default for EnforcementRules {
    fn default() -> Self {
        Self::standard()
    }
}
