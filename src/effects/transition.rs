//! Transition rows and the events that trigger them.

use crate::core::Guard;
use crate::model::{BounceReason, BranchDirectory, Category, Cheque, ChequeState};
use crate::ports::{Ledger, Notifier};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Something that happened to a cheque.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChequeEvent {
    Register,
    ReturnToCashbox,
    ReturnToOwner,
    Bounce { reason: BounceReason },
    /// `None` keeps the bank account already on the cheque.
    Deposit { bank_account: Option<String> },
    Cancel,
    ReCash,
    Return,
    Clear,
    Transfer { destination: String },
    Receive,
    RevertToPrevious,
    RevertToDraft,
}

impl ChequeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Register => EventKind::Register,
            Self::ReturnToCashbox => EventKind::ReturnToCashbox,
            Self::ReturnToOwner => EventKind::ReturnToOwner,
            Self::Bounce { .. } => EventKind::Bounce,
            Self::Deposit { .. } => EventKind::Deposit,
            Self::Cancel => EventKind::Cancel,
            Self::ReCash => EventKind::ReCash,
            Self::Return => EventKind::Return,
            Self::Clear => EventKind::Clear,
            Self::Transfer { .. } => EventKind::Transfer,
            Self::Receive => EventKind::Receive,
            Self::RevertToPrevious => EventKind::RevertToPrevious,
            Self::RevertToDraft => EventKind::RevertToDraft,
        }
    }
}

/// Payload-free discriminant of [`ChequeEvent`], used to key the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Register,
    ReturnToCashbox,
    ReturnToOwner,
    Bounce,
    Deposit,
    Cancel,
    ReCash,
    Return,
    Clear,
    Transfer,
    Receive,
    RevertToPrevious,
    RevertToDraft,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::ReturnToCashbox => "return_to_cashbox",
            Self::ReturnToOwner => "return_to_owner",
            Self::Bounce => "bounce",
            Self::Deposit => "deposit",
            Self::Cancel => "cancel",
            Self::ReCash => "re_cash",
            Self::Return => "return",
            Self::Clear => "clear",
            Self::Transfer => "transfer",
            Self::Receive => "receive",
            Self::RevertToPrevious => "revert_to_previous",
            Self::RevertToDraft => "revert_to_draft",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Collaborators and lookups a transition may use.
///
/// `category` is the cheque's category resolved by the caller, since the
/// cheque only stores its id.
#[derive(Clone, Copy)]
pub struct TransitionEnv<'a> {
    pub ledger: &'a dyn Ledger,
    pub notifier: &'a dyn Notifier,
    pub category: Option<&'a Category>,
    pub branches: &'a BranchDirectory,
    pub now: DateTime<Utc>,
}

impl TransitionEnv<'_> {
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// Everything an effect knows about the step it belongs to.
pub struct Step<'s, 'a> {
    pub event: &'s ChequeEvent,
    pub env: &'s TransitionEnv<'a>,
    pub from: ChequeState,
    pub to: ChequeState,
}

/// Side effect run against a working copy of the cheque. Returning an
/// error discards the copy.
pub type TransitionEffect =
    Arc<dyn Fn(&mut Cheque, &Step<'_, '_>) -> crate::error::Result<()> + Send + Sync>;

/// Where a transition lands.
#[derive(Clone)]
pub enum Target {
    Fixed(ChequeState),
    /// Computed from the cheque before the effect runs.
    Resolved(Arc<dyn Fn(&Cheque) -> ChequeState + Send + Sync>),
}

impl Target {
    pub fn resolve(&self, cheque: &Cheque) -> ChequeState {
        match self {
            Self::Fixed(state) => *state,
            Self::Resolved(resolve) => resolve(cheque),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(state) => f.debug_tuple("Fixed").field(state).finish(),
            Self::Resolved(_) => f.write_str("Resolved(..)"),
        }
    }
}

/// One row of the lifecycle table.
#[derive(Clone)]
pub struct Transition {
    pub event: EventKind,
    pub from: Vec<ChequeState>,
    pub to: Target,
    pub guard: Option<Guard<Cheque>>,
    pub effect: Option<TransitionEffect>,
}

impl Transition {
    /// Whether the row is keyed on this event and source state.
    pub fn matches(&self, event: EventKind, state: ChequeState) -> bool {
        self.event == event && self.from.contains(&state)
    }

    /// Check if this transition can execute for the cheque (pure).
    pub fn can_execute(&self, event: EventKind, cheque: &Cheque) -> bool {
        self.matches(event, cheque.state()) && self.guard.as_ref().is_none_or(|g| g.check(cheque))
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("event", &self.event)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("guard", &self.guard)
            .finish()
    }
}
