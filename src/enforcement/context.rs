//! Context provided to enforcement checks.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A payment the processor has already accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedTransaction {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub at: DateTime<Utc>,
}

/// The payment under review plus the processor's recent history.
#[derive(Clone, Debug)]
pub struct TransactionContext<'a> {
    pub amount: Decimal,
    pub at: DateTime<Utc>,
    pub recent: &'a [RecordedTransaction],
}

impl<'a> TransactionContext<'a> {
    pub fn new(amount: Decimal, at: DateTime<Utc>, recent: &'a [RecordedTransaction]) -> Self {
        Self { amount, at, recent }
    }

    fn within(&self, window: Duration) -> impl Iterator<Item = &'a RecordedTransaction> {
        let cutoff = self.at - window;
        let at = self.at;
        let recent: &'a [RecordedTransaction] = self.recent;
        recent
            .iter()
            .filter(move |t| t.at > cutoff && t.at <= at)
    }

    /// Number of earlier transactions inside `window` (pure)
    pub fn count_within(&self, window: Duration) -> usize {
        self.within(window).count()
    }

    /// Volume of earlier transactions inside `window` (pure)
    pub fn volume_within(&self, window: Duration) -> Decimal {
        self.within(window).map(|t| t.amount).sum()
    }

    /// Mean amount of the recent window, if there is one.
    pub fn average(&self) -> Option<Decimal> {
        if self.recent.is_empty() {
            return None;
        }
        let total: Decimal = self.recent.iter().map(|t| t.amount).sum();
        Some(total / Decimal::from(self.recent.len()))
    }
}
