//! Builder for constructing the lifecycle state machine.

use crate::builder::error::BuildError;
use crate::builder::transition::TransitionBuilder;
use crate::core::State;
use crate::effects::{StateMachine, Transition};

/// Collects transition rows and checks them before producing a
/// [`StateMachine`].
#[derive(Default)]
pub struct StateMachineBuilder {
    transitions: Vec<Transition>,
}

impl StateMachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transition using a builder.
    /// Returns an error if the builder fails validation.
    pub fn transition(mut self, builder: TransitionBuilder) -> Result<Self, BuildError> {
        let transition = builder.build()?;
        self.transitions.push(transition);
        Ok(self)
    }

    /// Add a pre-built transition.
    pub fn add_transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn transitions(mut self, transitions: Vec<Transition>) -> Self {
        self.transitions.extend(transitions);
        self
    }

    /// Build the state machine.
    ///
    /// Rows are tried in the order they were added. Two rows for the same
    /// event and source state are only accepted if at least one of them is
    /// guarded.
    pub fn build(self) -> Result<StateMachine, BuildError> {
        if self.transitions.is_empty() {
            return Err(BuildError::NoTransitions);
        }

        for (index, row) in self.transitions.iter().enumerate() {
            if row.guard.is_some() {
                continue;
            }
            let clash = self.transitions[index + 1..]
                .iter()
                .filter(|other| other.guard.is_none() && other.event == row.event)
                .find_map(|other| row.from.iter().find(|s| other.from.contains(s)));
            if let Some(state) = clash {
                return Err(BuildError::Ambiguous {
                    event: row.event.name().to_string(),
                    state: state.name().to_string(),
                });
            }
        }

        Ok(StateMachine::new(self.transitions))
    }
}
