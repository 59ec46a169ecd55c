//! Payment processors: fees, limits and posting.

mod fee;

pub use fee::{FeeContext, FeePolicy, FeeSchedule, FeeTier, PeakHours, VolumeDiscount};

use crate::enforcement::{
    EnforcementRules, RecordedTransaction, TransactionContext, ViolationError, ViolationStrategy,
};
use crate::error::{ChequeError, Result};
use crate::ports::{Ledger, PostingId, PostingLine, PostingRequest};
use chrono::{DateTime, Duration, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::{error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    CreditCard,
    DebitCard,
    DigitalWallet,
    Cash,
    Cheque,
}

/// Where a processed payment lands in the ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessorAccounts {
    pub journal: String,
    pub debit_account: String,
    pub credit_account: String,
    pub fee_account: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessorStats {
    pub total_transactions: u64,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_amount: Decimal,
    pub failure_count: u64,
    pub last_transaction: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Payment {
    pub reference: String,
    pub amount: Decimal,
}

impl Payment {
    pub fn new(reference: impl Into<String>, amount: Decimal) -> Self {
        Self {
            reference: reference.into(),
            amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PaymentReceipt {
    pub posting: PostingId,
    pub fee: Decimal,
    pub net: Decimal,
}

/// A configured payment channel with its own fees, limits and counters.
pub struct PaymentProcessor {
    code: String,
    name: String,
    method: PaymentMethod,
    accounts: ProcessorAccounts,
    api_endpoint: Option<String>,
    fees: FeePolicy,
    rules: EnforcementRules,
    active: bool,
    locked: bool,
    stats: ProcessorStats,
    recent: Vec<RecordedTransaction>,
}

impl PaymentProcessor {
    /// Build a processor with the standard velocity and spike checks.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        method: PaymentMethod,
        accounts: ProcessorAccounts,
        fees: FeePolicy,
    ) -> Result<Self> {
        let processor = Self {
            code: code.into(),
            name: name.into(),
            method,
            accounts,
            api_endpoint: None,
            fees,
            rules: EnforcementRules::standard(),
            active: true,
            locked: false,
            stats: ProcessorStats::default(),
            recent: Vec::new(),
        };

        let required = |value: &str, field: &str| {
            if value.trim().is_empty() {
                Validation::fail(format!("{field} is required"))
            } else {
                Validation::success(())
            }
        };
        let checks: Vec<Validation<(), NonEmptyVec<String>>> = vec![
            required(&processor.code, "processor code"),
            required(&processor.name, "processor name"),
            required(&processor.accounts.journal, "journal"),
            required(&processor.accounts.debit_account, "debit account"),
            required(&processor.accounts.credit_account, "credit account"),
            required(&processor.accounts.fee_account, "fee account"),
            processor.fees.validate(),
        ];
        match Validation::all_vec(checks) {
            Validation::Success(_) => Ok(processor),
            Validation::Failure(errors) => Err(ChequeError::from_violations(errors.iter())),
        }
    }

    pub fn with_rules(mut self, rules: EnforcementRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_api_endpoint(mut self, endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        let valid = ["http://", "https://"]
            .iter()
            .any(|scheme| endpoint.len() > scheme.len() && endpoint.starts_with(scheme));
        if !valid {
            return Err(ChequeError::validation(
                "API endpoint must start with http:// or https://",
            ));
        }
        self.api_endpoint = Some(endpoint);
        Ok(self)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn api_endpoint(&self) -> Option<&str> {
        self.api_endpoint.as_deref()
    }

    pub fn fees(&self) -> &FeePolicy {
        &self.fees
    }

    pub fn set_fees(&mut self, fees: FeePolicy) -> Result<()> {
        fees.ensure_valid()?;
        self.fees = fees;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn stats(&self) -> &ProcessorStats {
        &self.stats
    }

    pub fn failure_count(&self) -> u64 {
        self.stats.failure_count
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Re-enable a processor locked after suspicious activity.
    pub fn unlock(&mut self) {
        if self.locked {
            self.locked = false;
            info!(processor = %self.code, "payment processor unlocked");
        }
    }

    /// Fee this processor would charge for `amount` at `now`.
    pub fn quote(&self, amount: Decimal, now: DateTime<Utc>) -> Decimal {
        let context = FeeContext {
            daily_volume: self.daily_volume(now),
            hour: now.hour(),
        };
        self.fees.calculate(amount, context)
    }

    fn daily_volume(&self, now: DateTime<Utc>) -> Decimal {
        TransactionContext::new(Decimal::ZERO, now, &self.recent).volume_within(Duration::hours(24))
    }

    /// Check, charge and post a payment.
    ///
    /// Limit breaches reject the payment. Suspicious patterns are handled by
    /// the configured [`ViolationStrategy`]. A ledger failure bumps the
    /// failure counter and is returned as [`ChequeError::Processing`].
    pub fn process_payment(
        &mut self,
        payment: &Payment,
        ledger: &dyn Ledger,
        now: DateTime<Utc>,
    ) -> Result<PaymentReceipt> {
        if !self.active {
            return Err(ChequeError::guard(
                "process payment",
                "inactive",
                format!("processor {} is not active", self.code),
            ));
        }
        if self.locked {
            return Err(ChequeError::guard(
                "process payment",
                "locked",
                format!("processor {} is locked", self.code),
            ));
        }
        if payment.amount <= Decimal::ZERO {
            return Err(ChequeError::validation(
                "payment amount must be greater than zero",
            ));
        }

        let cutoff = now - Duration::hours(24);
        self.recent.retain(|t| t.at > cutoff);
        self.enforce(payment, now)?;

        let fee = self.quote(payment.amount, now);
        if fee > payment.amount {
            return Err(ChequeError::validation(format!(
                "fee {fee} exceeds payment amount {}",
                payment.amount
            )));
        }
        let net = payment.amount - fee;

        let request = self.posting_request(payment, fee, net, now);
        let posting = match ledger.post(request) {
            Ok(id) => id,
            Err(err) => {
                self.stats.failure_count += 1;
                error!(processor = %self.code, reference = %payment.reference, error = %err, "payment processing failed");
                return Err(ChequeError::processing(format!(
                    "payment {} via {} failed: {err}",
                    payment.reference, self.name
                )));
            }
        };

        self.stats.total_transactions += 1;
        self.stats.total_amount += payment.amount;
        self.stats.last_transaction = Some(now);
        self.recent.push(RecordedTransaction {
            amount: payment.amount,
            at: now,
        });

        info!(processor = %self.code, reference = %payment.reference, amount = %payment.amount, %fee, "payment processed");
        Ok(PaymentReceipt { posting, fee, net })
    }

    fn enforce(&mut self, payment: &Payment, now: DateTime<Utc>) -> Result<()> {
        let context = TransactionContext::new(payment.amount, now, &self.recent);
        let Validation::Failure(errors) = self.rules.enforce(&context) else {
            return Ok(());
        };

        let (suspicious, breaches): (Vec<&ViolationError>, Vec<&ViolationError>) =
            errors.iter().partition(|v| v.is_suspicious());

        if !suspicious.is_empty() {
            match self.rules.violation_strategy() {
                ViolationStrategy::LockProcessor => {
                    self.locked = true;
                    warn!(processor = %self.code, violations = suspicious.len(), "suspicious activity, processor locked");
                }
                ViolationStrategy::Reject => {
                    warn!(processor = %self.code, violations = suspicious.len(), "suspicious activity, payment rejected");
                }
                ViolationStrategy::IgnoreAndLog => {
                    warn!(processor = %self.code, violations = suspicious.len(), "suspicious activity ignored");
                    if breaches.is_empty() {
                        return Ok(());
                    }
                    return Err(ChequeError::from_violations(breaches));
                }
            }
        }

        Err(ChequeError::from_violations(errors.iter()))
    }

    fn posting_request(
        &self,
        payment: &Payment,
        fee: Decimal,
        net: Decimal,
        now: DateTime<Utc>,
    ) -> PostingRequest {
        let reference = format!("Payment: {}", payment.reference);
        let mut request = PostingRequest::new(&self.accounts.journal, now.date_naive(), reference)
            .line(PostingLine::debit(
                &self.accounts.debit_account,
                payment.amount,
                format!("Payment received via {}", self.name),
            ));
        if net > Decimal::ZERO {
            request = request.line(PostingLine::credit(
                &self.accounts.credit_account,
                net,
                format!("Payment processed via {}", self.name),
            ));
        }
        if fee > Decimal::ZERO {
            request = request.line(PostingLine::credit(
                &self.accounts.fee_account,
                fee,
                format!("Processing fee for {}", self.name),
            ));
        }
        request
    }
}
