//! The cheque record and its lifecycle states.

use crate::core::{State, StateHistory};
use crate::error::{ChequeError, Result};
use crate::model::branch::TransferState;
use crate::model::category::CategoryId;
use crate::ports::PostingId;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChequeId(pub u64);

impl fmt::Display for ChequeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether the cheque was received or written by us.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BounceReason {
    InsufficientFunds,
    AccountClosed,
    StopPayment,
    TechnicalError,
    Other,
}

crate::state_enum! {
    /// Where a cheque is in its lifecycle.
    ///
    /// `Cancelled` and `Done` are terminal. `Bounced` is the only failure
    /// state; a bounced cheque can still be returned or sent back to the
    /// cashbox.
    pub enum ChequeState {
        Draft => "draft",
        Registered => "registered",
        Deposited => "deposited",
        Transferred => "transferred",
        Bounced => "bounced",
        ReturnCashbox => "return_cashbox",
        ReturnOwner => "return_owner",
        Returned => "returned",
        Cancelled => "cancelled",
        Done => "done",
    }
    final: [Cancelled, Done]
    error: [Bounced]
}

/// Input for creating a cheque.
///
/// Either name a `book` to draw the serial from, or leave it empty and the
/// serial comes from the incoming/outgoing sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct ChequeDraft {
    pub direction: Direction,
    pub amount: Decimal,
    pub payer: String,
    pub due_date: NaiveDate,
    pub book: Option<String>,
    pub category: Option<CategoryId>,
    pub branch: Option<String>,
    pub bank_account: Option<String>,
    pub description: Option<String>,
}

impl ChequeDraft {
    pub fn new(
        direction: Direction,
        amount: Decimal,
        payer: impl Into<String>,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            direction,
            amount,
            payer: payer.into(),
            due_date,
            book: None,
            category: None,
            branch: None,
            bank_account: None,
            description: None,
        }
    }

    pub fn from_book(mut self, book: impl Into<String>) -> Self {
        self.book = Some(book.into());
        self
    }

    pub fn with_category(mut self, category: CategoryId) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_bank_account(mut self, account: impl Into<String>) -> Self {
        self.bank_account = Some(account.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check every field, collecting all problems.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<String>> {
        let amount = if self.amount > Decimal::ZERO {
            Validation::success(())
        } else {
            Validation::fail(format!("amount must be positive, got {}", self.amount))
        };

        let payer = if self.payer.trim().is_empty() {
            Validation::fail("payer is required".to_string())
        } else {
            Validation::success(())
        };

        let book = match &self.book {
            Some(name) if name.trim().is_empty() => {
                Validation::fail("book name must not be blank".to_string())
            }
            _ => Validation::success(()),
        };

        Validation::all_vec(vec![amount, payer, book]).map(|_| ())
    }

    pub(crate) fn ensure_valid(&self) -> Result<()> {
        match self.validate() {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => Err(ChequeError::from_violations(errors.iter())),
        }
    }
}

/// A single cheque and everything the lifecycle needs to know about it.
///
/// Fields are only changed through the registry and the state machine, so
/// the invariants (positive amount, consistent `previous_state`, one entry
/// in the log per state change) cannot be broken from outside the crate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cheque {
    pub(crate) id: ChequeId,
    pub(crate) serial: String,
    pub(crate) tracking_number: Option<String>,
    pub(crate) book: Option<String>,
    pub(crate) direction: Direction,
    #[serde(with = "rust_decimal::serde::str")]
    pub(crate) amount: Decimal,
    pub(crate) payer: String,
    pub(crate) due_date: NaiveDate,
    pub(crate) state: ChequeState,
    pub(crate) previous_state: Option<ChequeState>,
    pub(crate) bounced: bool,
    pub(crate) bounce_reason: Option<BounceReason>,
    pub(crate) category: Option<CategoryId>,
    pub(crate) category_locked: bool,
    pub(crate) debit_account: Option<String>,
    pub(crate) credit_account: Option<String>,
    pub(crate) journal: Option<String>,
    pub(crate) bank_account: Option<String>,
    pub(crate) branch: Option<String>,
    pub(crate) transfer_state: TransferState,
    pub(crate) transfer_source: Option<String>,
    pub(crate) transfer_destination: Option<String>,
    pub(crate) postings: Vec<PostingId>,
    pub(crate) return_date: Option<NaiveDate>,
    pub(crate) cashed_date: Option<NaiveDate>,
    pub(crate) description: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) history: StateHistory<ChequeState>,
}

impl Cheque {
    pub(crate) fn from_draft(
        id: ChequeId,
        serial: String,
        tracking_number: Option<String>,
        draft: ChequeDraft,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            serial,
            tracking_number,
            book: draft.book,
            direction: draft.direction,
            amount: draft.amount,
            payer: draft.payer,
            due_date: draft.due_date,
            state: ChequeState::Draft,
            previous_state: None,
            bounced: false,
            bounce_reason: None,
            category: draft.category,
            category_locked: false,
            debit_account: None,
            credit_account: None,
            journal: None,
            bank_account: draft.bank_account,
            branch: draft.branch,
            transfer_state: TransferState::None,
            transfer_source: None,
            transfer_destination: None,
            postings: Vec::new(),
            return_date: None,
            cashed_date: None,
            description: draft.description,
            created_at,
            history: StateHistory::new(),
        }
    }

    pub fn id(&self) -> ChequeId {
        self.id
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn book(&self) -> Option<&str> {
        self.book.as_deref()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn payer(&self) -> &str {
        &self.payer
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn state(&self) -> ChequeState {
        self.state
    }

    pub fn previous_state(&self) -> Option<ChequeState> {
        self.previous_state
    }

    pub fn is_bounced(&self) -> bool {
        self.bounced
    }

    pub fn bounce_reason(&self) -> Option<BounceReason> {
        self.bounce_reason
    }

    pub fn category(&self) -> Option<CategoryId> {
        self.category
    }

    pub fn is_category_locked(&self) -> bool {
        self.category_locked
    }

    pub fn debit_account(&self) -> Option<&str> {
        self.debit_account.as_deref()
    }

    pub fn credit_account(&self) -> Option<&str> {
        self.credit_account.as_deref()
    }

    pub fn journal(&self) -> Option<&str> {
        self.journal.as_deref()
    }

    pub fn bank_account(&self) -> Option<&str> {
        self.bank_account.as_deref()
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn transfer_state(&self) -> TransferState {
        self.transfer_state
    }

    pub fn transfer_source(&self) -> Option<&str> {
        self.transfer_source.as_deref()
    }

    pub fn transfer_destination(&self) -> Option<&str> {
        self.transfer_destination.as_deref()
    }

    pub fn postings(&self) -> &[PostingId] {
        &self.postings
    }

    pub fn return_date(&self) -> Option<NaiveDate> {
        self.return_date
    }

    pub fn cashed_date(&self) -> Option<NaiveDate> {
        self.cashed_date
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn history(&self) -> &StateHistory<ChequeState> {
        &self.history
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_final()
    }

    /// Whole days from `today` until the due date; negative once overdue.
    pub fn days_to_due(&self, today: NaiveDate) -> i64 {
        (self.due_date - today).num_days()
    }

    pub(crate) fn unlock_category(&mut self) {
        self.category_locked = false;
        self.debit_account = None;
        self.credit_account = None;
        self.journal = None;
    }
}
