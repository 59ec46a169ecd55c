//! Builder API for creating enforcement rules.

use crate::enforcement::context::TransactionContext;
use crate::enforcement::rules::{EnforcementRules, ValidationCheck};
use crate::enforcement::violations::{ViolationError, ViolationStrategy};
use rust_decimal::Decimal;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Builder for creating enforcement rules. Starts with every check off.
pub struct EnforcementBuilder {
    max_transaction: Option<Decimal>,
    max_daily: Option<Decimal>,
    max_per_hour: Option<usize>,
    spike_factor: Option<Decimal>,
    required_checks: Vec<ValidationCheck>,
    on_violation: ViolationStrategy,
}

impl EnforcementBuilder {
    pub fn new() -> Self {
        Self {
            max_transaction: None,
            max_daily: None,
            max_per_hour: None,
            spike_factor: None,
            required_checks: Vec::new(),
            on_violation: ViolationStrategy::default(),
        }
    }

    /// Largest single payment accepted
    pub fn max_transaction(mut self, limit: Decimal) -> Self {
        self.max_transaction = Some(limit);
        self
    }

    /// Largest volume accepted over a rolling 24 hours
    pub fn max_daily(mut self, limit: Decimal) -> Self {
        self.max_daily = Some(limit);
        self
    }

    pub fn max_per_hour(mut self, count: usize) -> Self {
        self.max_per_hour = Some(count);
        self
    }

    pub fn spike_factor(mut self, factor: Decimal) -> Self {
        self.spike_factor = Some(factor);
        self
    }

    /// Add a custom validation check
    pub fn require<F>(mut self, check: F) -> Self
    where
        F: for<'a> Fn(&TransactionContext<'a>) -> Validation<(), NonEmptyVec<ViolationError>>
            + Send
            + Sync
            + 'static,
    {
        self.required_checks.push(Box::new(check));
        self
    }

    /// Add a simple predicate check with error message
    pub fn require_pred<F>(mut self, predicate: F, error_msg: String) -> Self
    where
        F: for<'a> Fn(&TransactionContext<'a>) -> bool + Send + Sync + 'static,
    {
        let check = move |ctx: &TransactionContext<'_>| {
            if predicate(ctx) {
                Validation::success(())
            } else {
                Validation::fail(ViolationError::CustomCheckFailed {
                    message: error_msg.clone(),
                })
            }
        };
        self.required_checks.push(Box::new(check));
        self
    }

    /// Set violation handling strategy
    pub fn on_violation(mut self, strategy: ViolationStrategy) -> Self {
        self.on_violation = strategy;
        self
    }

    /// Build the enforcement rules
    pub fn build(self) -> EnforcementRules {
        EnforcementRules {
            max_transaction: self.max_transaction,
            max_daily: self.max_daily,
            max_per_hour: self.max_per_hour,
            spike_factor: self.spike_factor,
            required_checks: self.required_checks,
            on_violation: self.on_violation,
        }
    }
}

impl Default for EnforcementBuilder {
    fn default() -> Self {
        Self::new()
    }
}
