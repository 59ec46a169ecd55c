//! Builder API for declaring the cheque lifecycle table.
//!
//! Rows are declared with [`TransitionBuilder`], collected and checked by
//! [`StateMachineBuilder`]. The [`state_enum!`](crate::state_enum) macro
//! declares the state enums themselves.

pub mod error;
pub mod machine;
pub mod macros;
pub mod transition;

pub use error::BuildError;
pub use machine::StateMachineBuilder;
pub use transition::TransitionBuilder;

use crate::effects::{EventKind, Target, Transition};
use crate::model::ChequeState;

/// Create an unguarded row with no side effect.
///
/// # Example
///
/// ```
/// use chequeflow::builder::simple_transition;
/// use chequeflow::effects::EventKind;
/// use chequeflow::model::ChequeState;
///
/// let row = simple_transition(
///     EventKind::ReturnToOwner,
///     &[ChequeState::ReturnCashbox],
///     ChequeState::ReturnOwner,
/// );
/// assert!(row.guard.is_none());
/// ```
pub fn simple_transition(event: EventKind, from: &[ChequeState], to: ChequeState) -> Transition {
    Transition {
        event,
        from: from.to_vec(),
        to: Target::Fixed(to),
        guard: None,
        effect: None,
    }
}
