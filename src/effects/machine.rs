//! Executes lifecycle transitions against a cheque.

use crate::core::{State, StateTransition};
use crate::effects::transition::{ChequeEvent, EventKind, Step, Transition, TransitionEnv};
use crate::error::{ChequeError, Result};
use crate::model::{Cheque, ChequeState};
use tracing::{debug, info};

/// The lifecycle table plus the logic to fire events against it.
///
/// The machine holds no cheque state of its own, so one instance serves
/// every cheque in a registry.
pub struct StateMachine {
    transitions: Vec<Transition>,
}

impl StateMachine {
    /// Use [`StateMachineBuilder`](crate::builder::StateMachineBuilder) to
    /// get a checked table.
    pub(crate) fn new(transitions: Vec<Transition>) -> Self {
        Self { transitions }
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Events that would currently pass both the state and guard checks.
    pub fn available_events(&self, cheque: &Cheque) -> Vec<EventKind> {
        let mut events: Vec<EventKind> = Vec::new();
        for row in &self.transitions {
            if row.can_execute(row.event, cheque) && !events.contains(&row.event) {
                events.push(row.event);
            }
        }
        events
    }

    /// Fire `event` against `cheque`.
    ///
    /// The matching row's effect runs on a copy; the cheque is only
    /// replaced once the effect succeeds, with `previous_state` set to the
    /// state being left and the step appended to its history.
    pub fn fire(
        &self,
        cheque: &mut Cheque,
        event: &ChequeEvent,
        env: &TransitionEnv<'_>,
    ) -> Result<StateTransition<ChequeState>> {
        let kind = event.kind();
        let from = cheque.state();
        let row = self.select(kind, cheque)?;

        let to = row.to.resolve(cheque);
        let mut working = cheque.clone();
        if let Some(effect) = &row.effect {
            let step = Step {
                event,
                env,
                from,
                to,
            };
            effect(&mut working, &step)?;
        }

        let record = StateTransition {
            from,
            to,
            event: kind.name().to_string(),
            timestamp: env.now,
        };
        working.previous_state = Some(from);
        working.state = to;
        working.history = working.history.record(record.clone());
        *cheque = working;

        info!(
            cheque_id = cheque.id().0,
            serial = %cheque.serial(),
            event = kind.name(),
            from = from.name(),
            to = to.name(),
            "cheque transitioned"
        );
        Ok(record)
    }

    fn select(&self, kind: EventKind, cheque: &Cheque) -> Result<&Transition> {
        let state = cheque.state();
        let candidates: Vec<&Transition> = self
            .transitions
            .iter()
            .filter(|row| row.matches(kind, state))
            .collect();

        if candidates.is_empty() {
            debug!(event = kind.name(), state = state.name(), "no transition");
            return Err(ChequeError::guard(kind.name(), state.name(), "no transition"));
        }

        if let Some(row) = candidates.iter().find(|row| row.can_execute(kind, cheque)) {
            return Ok(*row);
        }

        let blocked = candidates
            .iter()
            .filter_map(|row| row.guard.as_ref().map(|g| g.description().to_string()))
            .collect::<Vec<_>>()
            .join(" / ");
        Err(ChequeError::guard(
            kind.name(),
            state.name(),
            format!("guard not satisfied: {blocked}"),
        ))
    }
}
