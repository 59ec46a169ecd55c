//! The effectful side of the lifecycle.
//!
//! - **Transitions**: table rows keyed by event and source state, with an
//!   optional named guard and an optional side effect
//! - **State machine**: picks the row, runs the effect on a working copy,
//!   and commits state, `previous_state` and history together
//! - **Lifecycle**: the standard cheque table with its ledger postings and
//!   transfer notifications
//!
//! Effects reach the outside world only through the collaborators in
//! [`TransitionEnv`].

mod lifecycle;
mod machine;
mod transition;

pub use machine::StateMachine;
pub use transition::{
    ChequeEvent, EventKind, Step, Target, Transition, TransitionEffect, TransitionEnv,
};
