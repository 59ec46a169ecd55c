//! Core State trait shared by cheque states and cheque book statuses.
//!
//! Both lifecycles are closed enums; the trait gives the machine, the
//! transition log and the error messages a uniform way to name them.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for lifecycle states.
///
/// All methods are pure. Implementations are normally generated by the
/// [`state_enum!`](crate::state_enum) macro, which also fixes the
/// snake_case name used in logs and serialized records.
///
/// # Example
///
/// ```rust
/// use chequeflow::core::State;
/// use chequeflow::model::ChequeState;
///
/// assert_eq!(ChequeState::ReturnCashbox.name(), "return_cashbox");
/// assert!(ChequeState::Done.is_final());
/// assert!(!ChequeState::Bounced.is_final());
/// ```
pub trait State:
    Copy + Eq + Hash + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync
{
    /// Stable snake_case name for display, logging and persistence.
    fn name(&self) -> &str;

    /// Terminal states accept no further forward transitions.
    ///
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }

    /// States that represent a failed outcome (a bounced cheque, a
    /// cancelled book).
    ///
    /// Default implementation returns `false`.
    fn is_error(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookStatus, ChequeState};

    #[test]
    fn cheque_state_names_are_snake_case() {
        assert_eq!(ChequeState::Draft.name(), "draft");
        assert_eq!(ChequeState::Registered.name(), "registered");
        assert_eq!(ChequeState::ReturnOwner.name(), "return_owner");
        assert_eq!(ChequeState::Cancelled.name(), "cancelled");
    }

    #[test]
    fn terminal_cheque_states() {
        let terminal: Vec<_> = ChequeState::ALL
            .iter()
            .filter(|s| s.is_final())
            .copied()
            .collect();
        assert_eq!(terminal, vec![ChequeState::Cancelled, ChequeState::Done]);
    }

    #[test]
    fn error_states() {
        assert!(ChequeState::Bounced.is_error());
        assert!(!ChequeState::Returned.is_error());
        assert!(BookStatus::Cancelled.is_error());
        assert!(!BookStatus::Depleted.is_error());
    }

    #[test]
    fn state_serializes_with_its_name() {
        let json = serde_json::to_string(&ChequeState::ReturnCashbox).unwrap();
        assert_eq!(json, "\"return_cashbox\"");
        let back: ChequeState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ChequeState::ReturnCashbox);
    }

    #[test]
    fn display_matches_name() {
        assert_eq!(BookStatus::Depleted.to_string(), "depleted");
        assert_eq!(ChequeState::Deposited.to_string(), "deposited");
    }
}
