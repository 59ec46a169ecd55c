//! Property-based tests for allocation, the lifecycle and fees.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use chequeflow::config::ChequeConfig;
use chequeflow::core::{Guard, State, StateHistory, StateTransition};
use chequeflow::effects::ChequeEvent;
use chequeflow::model::{
    BounceReason, Branch, Category, CategoryId, ChequeBook, ChequeDraft, ChequeState, Direction,
    SerialRange,
};
use chequeflow::ports::{FixedClock, MemoryLedger, MemoryNotifier, MemoryScheduler, MemorySequences};
use chequeflow::processor::{FeeContext, FeePolicy};
use chequeflow::reminder::ReminderPolicy;
use chequeflow::registry::{ChequeRegistry, Services};
use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;

prop_compose! {
    fn arbitrary_state()(variant in 0..ChequeState::ALL.len()) -> ChequeState {
        ChequeState::ALL[variant]
    }
}

fn event(variant: u8) -> ChequeEvent {
    match variant % 13 {
        0 => ChequeEvent::Register,
        1 => ChequeEvent::ReturnToCashbox,
        2 => ChequeEvent::ReturnToOwner,
        3 => ChequeEvent::Bounce {
            reason: BounceReason::InsufficientFunds,
        },
        4 => ChequeEvent::Deposit { bank_account: None },
        5 => ChequeEvent::Cancel,
        6 => ChequeEvent::ReCash,
        7 => ChequeEvent::Return,
        8 => ChequeEvent::Clear,
        9 => ChequeEvent::Transfer {
            destination: "B".to_string(),
        },
        10 => ChequeEvent::Receive,
        11 => ChequeEvent::RevertToPrevious,
        _ => ChequeEvent::RevertToDraft,
    }
}

fn registry() -> ChequeRegistry {
    let services = Services {
        ledger: Arc::new(MemoryLedger::new()),
        sequences: Arc::new(MemorySequences::new()),
        notifier: Arc::new(MemoryNotifier::new()),
        scheduler: Arc::new(MemoryScheduler::new()),
        clock: Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        )),
    };
    let mut registry = ChequeRegistry::new(services, &ChequeConfig::default()).unwrap();
    registry
        .add_category(Category::new(CategoryId(1), "Receivables", "1100", "4000", "CHQ"))
        .unwrap();
    registry
        .add_branch(Branch::new("A", "Head office", "1900", "BR-A").allow_transfer_to("B"))
        .unwrap();
    registry
        .add_branch(Branch::new("B", "North", "1910", "BR-B").allow_transfer_to("A"))
        .unwrap();
    registry
}

proptest! {
    #[test]
    fn issued_serials_are_distinct_and_ascending(start in 0u64..1_000_000, count in 2u64..120) {
        let mut book = ChequeBook::new(
            "Prop",
            "Bank",
            "0001",
            SerialRange::parse(&format!("{start:010}"), count).unwrap(),
            None,
        )
        .unwrap();
        book.activate(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), false).unwrap();

        let mut serials = Vec::new();
        while let Ok(serial) = book.get_next_serial() {
            serials.push(serial);
        }

        prop_assert_eq!(serials.len() as u64, count);
        prop_assert!(serials.iter().all(|s| s.len() == 10));
        prop_assert!(serials.windows(2).all(|w| w[0] < w[1]));
        let unique: HashSet<&String> = serials.iter().collect();
        prop_assert_eq!(unique.len(), serials.len());
        prop_assert_eq!(book.remaining(), 0);
    }

    #[test]
    fn guard_is_deterministic(state in arbitrary_state()) {
        let guard = Guard::new("not final", |s: &ChequeState| !s.is_final());
        let result1 = guard.check(&state);
        let result2 = guard.check(&state);
        prop_assert_eq!(result1, result2);
    }

    #[test]
    fn every_step_records_previous_state(events in prop::collection::vec(0u8..13, 1..25)) {
        let mut registry = registry();
        let due = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let id = registry
            .create(
                ChequeDraft::new(Direction::Incoming, Decimal::from(5_000), "Acme", due)
                    .with_category(CategoryId(1))
                    .with_branch("A")
                    .with_bank_account("1010"),
            )
            .unwrap();

        let mut steps = 0;
        for variant in events {
            let before = registry.get(id).unwrap().clone();
            match registry.fire(id, event(variant)) {
                Ok(step) => {
                    steps += 1;
                    let after = registry.get(id).unwrap();
                    prop_assert_eq!(step.from, before.state());
                    prop_assert_eq!(after.previous_state(), Some(before.state()));
                    prop_assert_eq!(after.state(), step.to);
                }
                Err(_) => {
                    // A refused event leaves the cheque exactly as it was.
                    prop_assert_eq!(registry.get(id).unwrap(), &before);
                }
            }
        }
        prop_assert_eq!(registry.get(id).unwrap().history().len(), steps);
    }

    #[test]
    fn revert_returns_to_the_state_just_left(events in prop::collection::vec(0u8..11, 1..15)) {
        let mut registry = registry();
        let due = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let id = registry
            .create(
                ChequeDraft::new(Direction::Outgoing, Decimal::from(750), "Acme", due)
                    .with_category(CategoryId(1))
                    .with_branch("A")
                    .with_bank_account("1010"),
            )
            .unwrap();

        for variant in events {
            if let Ok(step) = registry.fire(id, event(variant)) {
                let reverted = registry.revert_to_previous(id).unwrap();
                prop_assert_eq!(reverted.to, step.from);
                // Walk forward again so the sequence keeps exploring.
                let _ = registry.fire(id, event(variant));
            }
        }
    }

    #[test]
    fn larger_amounts_never_get_shorter_notice(a in 0u64..1_000_000_000, b in 0u64..1_000_000_000) {
        let policy = ReminderPolicy::default();
        let (small, large) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            policy.days_before(Decimal::from(large)) >= policy.days_before(Decimal::from(small))
        );
    }

    #[test]
    fn clamped_fee_stays_within_bounds(amount in 1u64..10_000_000, rate in 1u32..100) {
        let policy = FeePolicy::percentage(Decimal::from(rate))
            .with_bounds(Some(Decimal::from(2)), Some(Decimal::from(500)));
        let fee = policy.calculate(Decimal::from(amount), FeeContext::default());
        prop_assert!(fee >= Decimal::from(2));
        prop_assert!(fee <= Decimal::from(500));
    }

    #[test]
    fn history_record_is_pure(state1 in arbitrary_state(), state2 in arbitrary_state()) {
        let history = StateHistory::new();

        let transition = StateTransition {
            from: state1,
            to: state2,
            event: "register".to_string(),
            timestamp: Utc::now(),
        };

        let new_history = history.record(transition);

        // Original history unchanged
        prop_assert_eq!(history.transitions().len(), 0);
        prop_assert_eq!(new_history.transitions().len(), 1);
    }

    #[test]
    fn state_roundtrip_serialization(state in arbitrary_state()) {
        let json = serde_json::to_string(&state).unwrap();
        prop_assert_eq!(json.trim_matches('"'), state.name());
        let deserialized: ChequeState = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(state, deserialized);
    }
}
