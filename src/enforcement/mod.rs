//! Validation-based limit enforcement for payment processors.
//!
//! Every rule is checked and every violation is reported, using Stillwater's
//! `Validation` instead of stopping at the first failure. A processor that
//! rejects a payment can then tell the caller about the per-transaction
//! limit and the daily limit in one go.
//!
//! Violations come in two kinds. Limit breaches (single transaction, rolling
//! 24h volume) reject the payment. Suspicious patterns (too many payments in
//! an hour, an amount far above the recent average) are handed to the
//! processor's [`ViolationStrategy`].
//!
//! # Example
//!
//! ```rust
//! use chequeflow::enforcement::{EnforcementBuilder, TransactionContext, ViolationStrategy};
//! use chrono::Utc;
//! use rust_decimal::Decimal;
//!
//! let rules = EnforcementBuilder::new()
//!     .max_transaction(Decimal::from(10_000))
//!     .max_daily(Decimal::from(50_000))
//!     .max_per_hour(10)
//!     .on_violation(ViolationStrategy::LockProcessor)
//!     .build();
//!
//! let ctx = TransactionContext::new(Decimal::from(12_000), Utc::now(), &[]);
//! assert!(rules.enforce(&ctx).is_failure());
//! ```

pub mod builder;
pub mod context;
pub mod rules;
pub mod violations;

pub use builder::EnforcementBuilder;
pub use context::{RecordedTransaction, TransactionContext};
pub use rules::EnforcementRules;
pub use violations::{ViolationError, ViolationStrategy};
