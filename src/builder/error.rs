//! Build errors for the lifecycle table builders.

use thiserror::Error;

/// Errors that can occur when building transitions and state machines.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("Transition event not specified. Call .on(event)")]
    MissingEvent,

    #[error("Transition source state not specified. Call .from(state)")]
    MissingFromState,

    #[error("Transition target state not specified. Call .to(state) or .to_resolved(f)")]
    MissingToState,

    #[error("No transitions defined. Add at least one transition")]
    NoTransitions,

    /// Two unguarded rows would both fire for the same event and state.
    #[error("Event '{event}' from state '{state}' is declared more than once without a guard")]
    Ambiguous { event: String, state: String },
}
