//! Builder for constructing lifecycle transitions.

use crate::builder::error::BuildError;
use crate::core::Guard;
use crate::effects::{EventKind, Step, Target, Transition, TransitionEffect};
use crate::error::Result;
use crate::model::{Cheque, ChequeState};
use std::sync::Arc;

/// Builder for constructing transitions with a fluent API.
///
/// ```
/// use chequeflow::builder::TransitionBuilder;
/// use chequeflow::effects::EventKind;
/// use chequeflow::model::ChequeState;
///
/// let row = TransitionBuilder::new()
///     .on(EventKind::ReCash)
///     .from(ChequeState::Returned)
///     .to(ChequeState::Deposited)
///     .build()
///     .unwrap();
/// assert_eq!(row.from, vec![ChequeState::Returned]);
/// ```
#[derive(Default)]
pub struct TransitionBuilder {
    event: Option<EventKind>,
    from: Vec<ChequeState>,
    to: Option<Target>,
    guard: Option<Guard<Cheque>>,
    effect: Option<TransitionEffect>,
}

impl TransitionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the triggering event (required).
    pub fn on(mut self, event: EventKind) -> Self {
        self.event = Some(event);
        self
    }

    /// Add a source state. Call repeatedly or use [`from_any`](Self::from_any).
    pub fn from(mut self, state: ChequeState) -> Self {
        if !self.from.contains(&state) {
            self.from.push(state);
        }
        self
    }

    pub fn from_any(self, states: &[ChequeState]) -> Self {
        states.iter().fold(self, |builder, state| builder.from(*state))
    }

    /// Set a fixed target state.
    pub fn to(mut self, state: ChequeState) -> Self {
        self.to = Some(Target::Fixed(state));
        self
    }

    /// Compute the target from the cheque at fire time.
    pub fn to_resolved<F>(mut self, resolve: F) -> Self
    where
        F: Fn(&Cheque) -> ChequeState + Send + Sync + 'static,
    {
        self.to = Some(Target::Resolved(Arc::new(resolve)));
        self
    }

    pub fn guard(mut self, guard: Guard<Cheque>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a named guard using a closure.
    pub fn when<F>(mut self, description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Cheque) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(description, predicate));
        self
    }

    /// Set the side effect. Rows without one only change state.
    pub fn effect<F>(mut self, effect: F) -> Self
    where
        F: Fn(&mut Cheque, &Step<'_, '_>) -> Result<()> + Send + Sync + 'static,
    {
        self.effect = Some(Arc::new(effect));
        self
    }

    pub fn build(self) -> std::result::Result<Transition, BuildError> {
        let event = self.event.ok_or(BuildError::MissingEvent)?;
        if self.from.is_empty() {
            return Err(BuildError::MissingFromState);
        }
        let to = self.to.ok_or(BuildError::MissingToState)?;

        Ok(Transition {
            event,
            from: self.from,
            to,
            guard: self.guard,
            effect: self.effect,
        })
    }
}
