//! Core lifecycle types.
//!
//! - States via the `State` trait
//! - Named guard predicates
//! - Append-only transition history
//!
//! Nothing in this module performs I/O.

mod guard;
mod history;
mod state;

pub use guard::Guard;
pub use history::{StateHistory, StateTransition};
pub use state::State;
