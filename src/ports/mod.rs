//! Collaborator traits the lifecycle talks to.
//!
//! The crate never owns a ledger, a sequence table, a mail server, a job
//! runner or a wall clock. It asks for them through these traits and the
//! caller decides what sits behind them. [`memory`] has in-process versions
//! for embedding and tests.

pub mod memory;

use crate::error::{ChequeError, Result};
use crate::model::{ChequeId, Direction};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use memory::{
    FixedClock, MemoryLedger, MemoryNotifier, MemoryScheduler, MemorySequences, SystemClock,
};

/// Identifier of a ledger entry created on our behalf.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostingId(pub Uuid);

impl PostingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PostingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PostingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingStatus {
    Draft,
    Posted,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostingLine {
    pub account: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub debit: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub credit: Decimal,
    pub label: String,
}

impl PostingLine {
    pub fn debit(account: impl Into<String>, amount: Decimal, label: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            debit: amount,
            credit: Decimal::ZERO,
            label: label.into(),
        }
    }

    pub fn credit(account: impl Into<String>, amount: Decimal, label: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            debit: Decimal::ZERO,
            credit: amount,
            label: label.into(),
        }
    }
}

/// A journal entry to be posted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostingRequest {
    pub journal: String,
    pub date: NaiveDate,
    pub reference: String,
    pub lines: Vec<PostingLine>,
}

impl PostingRequest {
    pub fn new(journal: impl Into<String>, date: NaiveDate, reference: impl Into<String>) -> Self {
        Self {
            journal: journal.into(),
            date,
            reference: reference.into(),
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, line: PostingLine) -> Self {
        self.lines.push(line);
        self
    }

    /// Two-line entry moving `amount` from `credit_account` to `debit_account`.
    pub fn transfer(
        journal: impl Into<String>,
        date: NaiveDate,
        reference: impl Into<String>,
        debit_account: &str,
        credit_account: &str,
        amount: Decimal,
    ) -> Self {
        let reference = reference.into();
        Self::new(journal, date, reference.clone())
            .line(PostingLine::debit(debit_account, amount, reference.clone()))
            .line(PostingLine::credit(credit_account, amount, reference))
    }

    pub fn total_debit(&self) -> Decimal {
        self.lines.iter().map(|l| l.debit).sum()
    }

    pub fn total_credit(&self) -> Decimal {
        self.lines.iter().map(|l| l.credit).sum()
    }

    pub fn is_balanced(&self) -> bool {
        !self.lines.is_empty() && self.total_debit() == self.total_credit()
    }

    pub fn ensure_balanced(&self) -> Result<()> {
        if self.is_balanced() {
            Ok(())
        } else {
            Err(ChequeError::validation(format!(
                "posting '{}' is unbalanced: debit {} vs credit {}",
                self.reference,
                self.total_debit(),
                self.total_credit()
            )))
        }
    }
}

/// Double-entry ledger. Postings are opaque handles once created.
///
/// Status changes take a batch and apply to every posting in it or to none.
pub trait Ledger: Send + Sync {
    fn post(&self, request: PostingRequest) -> Result<PostingId>;

    fn cancel(&self, postings: &[PostingId]) -> Result<()>;

    /// Return posted entries to draft so they can be edited or dropped.
    fn reset_to_draft(&self, postings: &[PostingId]) -> Result<()>;
}

/// Monotonic counters used to number cheques not drawn from a book.
pub trait SequenceService: Send + Sync {
    fn next(&self, direction: Direction) -> Result<u64>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub message: String,
}

impl Notification {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<()>;
}

/// What a scheduled job does when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    DueDateReminder(ChequeId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub name: String,
    pub kind: TaskKind,
    pub next_run: NaiveDate,
    pub interval_days: u32,
    pub active: bool,
}

impl ScheduledTask {
    pub fn interval(&self) -> Duration {
        Duration::days(i64::from(self.interval_days))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(pub u64);

/// Registers recurring jobs. Running them is somebody else's business.
pub trait Scheduler: Send + Sync {
    /// Create the task, or replace the one with the same kind.
    fn upsert(&self, task: ScheduledTask) -> Result<JobHandle>;

    /// Remove the task for `kind`. Returns whether one existed.
    fn cancel(&self, kind: TaskKind) -> Result<bool>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
