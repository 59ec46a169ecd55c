//! End-to-end cheque lifecycle through the registry.

use chequeflow::config::ChequeConfig;
use chequeflow::core::State;
use chequeflow::effects::{ChequeEvent, EventKind};
use chequeflow::model::{
    BounceReason, Branch, Category, CategoryId, ChequeDraft, ChequeId, ChequeState, Direction,
    TransferState,
};
use chequeflow::ports::{
    Clock, FixedClock, MemoryLedger, MemoryNotifier, MemoryScheduler, MemorySequences,
    PostingStatus, TaskKind,
};
use chequeflow::registry::{ChequeRegistry, Services};
use chequeflow::ChequeError;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

struct Harness {
    registry: ChequeRegistry,
    ledger: Arc<MemoryLedger>,
    notifier: Arc<MemoryNotifier>,
    scheduler: Arc<MemoryScheduler>,
    clock: Arc<FixedClock>,
}

fn harness() -> Harness {
    let ledger = Arc::new(MemoryLedger::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let scheduler = Arc::new(MemoryScheduler::new());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap(),
    ));
    let services = Services {
        ledger: ledger.clone(),
        sequences: Arc::new(MemorySequences::new()),
        notifier: notifier.clone(),
        scheduler: scheduler.clone(),
        clock: clock.clone(),
    };

    let mut registry = ChequeRegistry::new(services, &ChequeConfig::default()).unwrap();
    registry
        .add_category(Category::new(CategoryId(1), "Receivables", "1100", "4000", "CHQ"))
        .unwrap();
    registry
        .add_branch(
            Branch::new("A", "Head office", "1900", "BR-A")
                .with_manager("alice")
                .allow_transfer_to("B"),
        )
        .unwrap();
    registry
        .add_branch(Branch::new("B", "North", "1910", "BR-B").with_manager("bob"))
        .unwrap();

    Harness {
        registry,
        ledger,
        notifier,
        scheduler,
        clock,
    }
}

fn due() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 15).unwrap()
}

fn draft(direction: Direction, amount: Decimal) -> ChequeDraft {
    ChequeDraft::new(direction, amount, "Acme", due())
        .with_category(CategoryId(1))
        .with_branch("A")
        .with_bank_account("1010")
}

fn new_cheque(h: &mut Harness) -> ChequeId {
    h.registry
        .create(draft(Direction::Incoming, dec!(1000)))
        .unwrap()
}

fn event_for(kind: EventKind) -> ChequeEvent {
    match kind {
        EventKind::Register => ChequeEvent::Register,
        EventKind::ReturnToCashbox => ChequeEvent::ReturnToCashbox,
        EventKind::ReturnToOwner => ChequeEvent::ReturnToOwner,
        EventKind::Bounce => ChequeEvent::Bounce {
            reason: BounceReason::AccountClosed,
        },
        EventKind::Deposit => ChequeEvent::Deposit { bank_account: None },
        EventKind::Cancel => ChequeEvent::Cancel,
        EventKind::ReCash => ChequeEvent::ReCash,
        EventKind::Return => ChequeEvent::Return,
        EventKind::Clear => ChequeEvent::Clear,
        EventKind::Transfer => ChequeEvent::Transfer {
            destination: "B".to_string(),
        },
        EventKind::Receive => ChequeEvent::Receive,
        EventKind::RevertToPrevious => ChequeEvent::RevertToPrevious,
        EventKind::RevertToDraft => ChequeEvent::RevertToDraft,
    }
}

const EVENTS: [EventKind; 13] = [
    EventKind::Register,
    EventKind::ReturnToCashbox,
    EventKind::ReturnToOwner,
    EventKind::Bounce,
    EventKind::Deposit,
    EventKind::Cancel,
    EventKind::ReCash,
    EventKind::Return,
    EventKind::Clear,
    EventKind::Transfer,
    EventKind::Receive,
    EventKind::RevertToPrevious,
    EventKind::RevertToDraft,
];

fn path_to(state: ChequeState) -> Vec<EventKind> {
    use ChequeState::*;
    use EventKind as E;
    match state {
        Draft => vec![],
        Registered => vec![E::Register],
        Deposited => vec![E::Register, E::Deposit],
        Transferred => vec![E::Register, E::Transfer],
        Bounced => vec![E::Register, E::Bounce],
        ReturnCashbox => vec![E::Register, E::ReturnToCashbox],
        ReturnOwner => vec![E::Register, E::ReturnToCashbox, E::ReturnToOwner],
        Returned => vec![E::Register, E::Return],
        Cancelled => vec![E::Register, E::Cancel],
        Done => vec![E::Register, E::Deposit, E::Clear],
    }
}

// Expected outcome when every guard's data is in place.
fn allowed(state: ChequeState, event: EventKind) -> bool {
    use ChequeState::*;
    match event {
        EventKind::Register => state == Draft,
        EventKind::ReturnToCashbox => matches!(state, Bounced | Registered | Done),
        EventKind::ReturnToOwner => state == ReturnCashbox,
        EventKind::Bounce => matches!(state, Registered | Deposited),
        EventKind::Deposit => matches!(state, Registered | Deposited),
        EventKind::Cancel => !state.is_final() && state != Draft,
        EventKind::ReCash => state == Returned,
        EventKind::Return => matches!(
            state,
            Bounced | Registered | Deposited | Transferred | ReturnCashbox | ReturnOwner
        ),
        EventKind::Clear => state == Deposited,
        EventKind::Transfer => state == Registered,
        EventKind::Receive => state == Transferred,
        EventKind::RevertToPrevious => true,
        EventKind::RevertToDraft => state != Draft,
    }
}

#[test]
fn transition_table_accepts_and_refuses_exactly_as_declared() {
    for state in ChequeState::ALL.iter().copied() {
        for event in EVENTS {
            let mut h = harness();
            let id = new_cheque(&mut h);
            for step in path_to(state) {
                h.registry.fire(id, event_for(step)).unwrap();
            }
            assert_eq!(h.registry.get(id).unwrap().state(), state);

            let result = h.registry.fire(id, event_for(event));
            if allowed(state, event) {
                let step = result.unwrap_or_else(|e| panic!("{event} from {state}: {e}"));
                assert_eq!(
                    h.registry.get(id).unwrap().previous_state(),
                    Some(state),
                    "{event} from {state}"
                );
                assert_eq!(step.from, state);
            } else {
                assert!(
                    matches!(result, Err(ChequeError::StateGuard { .. })),
                    "{event} from {state} should be refused"
                );
                assert_eq!(h.registry.get(id).unwrap().state(), state);
            }
        }
    }
}

#[test]
fn registration_posts_and_locks_category() {
    let mut h = harness();
    let id = new_cheque(&mut h);
    h.registry.register(id).unwrap();

    let cheque = h.registry.get(id).unwrap();
    assert!(cheque.is_category_locked());
    assert_eq!(cheque.journal(), Some("CHQ"));
    assert_eq!(cheque.postings().len(), 1);

    let entry = h.ledger.entry(cheque.postings()[0]).unwrap();
    assert_eq!(entry.request.lines[0].account, "1100");
    assert_eq!(entry.request.lines[0].debit, dec!(1000));
    assert_eq!(entry.request.lines[1].account, "4000");
    assert_eq!(entry.request.lines[1].credit, dec!(1000));
}

#[test]
fn register_without_category_names_the_guard() {
    let mut h = harness();
    let id = h
        .registry
        .create(ChequeDraft::new(Direction::Incoming, dec!(50), "Acme", due()))
        .unwrap();
    let err = h.registry.register(id).unwrap_err();
    assert!(err.to_string().contains("category assigned"));
}

#[test]
fn deposit_direction_decides_posting_sides() {
    let mut h = harness();
    let incoming = new_cheque(&mut h);
    let outgoing = h
        .registry
        .create(draft(Direction::Outgoing, dec!(300)))
        .unwrap();

    for id in [incoming, outgoing] {
        h.registry.register(id).unwrap();
        h.registry.deposit(id, Some("1020".to_string())).unwrap();
    }

    let incoming_deposit = h.registry.get(incoming).unwrap().postings()[1];
    let lines = h.ledger.entry(incoming_deposit).unwrap().request.lines;
    assert_eq!((lines[0].account.as_str(), lines[1].account.as_str()), ("1020", "1100"));

    let outgoing_deposit = h.registry.get(outgoing).unwrap().postings()[1];
    let lines = h.ledger.entry(outgoing_deposit).unwrap().request.lines;
    assert_eq!((lines[0].account.as_str(), lines[1].account.as_str()), ("4000", "1020"));
}

#[test]
fn bounce_then_return_cancels_postings() {
    let mut h = harness();
    let id = new_cheque(&mut h);
    h.registry.register(id).unwrap();
    h.registry.bounce(id, BounceReason::StopPayment).unwrap();

    let cheque = h.registry.get(id).unwrap();
    assert!(cheque.is_bounced());
    assert_eq!(cheque.bounce_reason(), Some(BounceReason::StopPayment));
    let postings = cheque.postings().to_vec();
    assert_eq!(postings.len(), 2);

    h.registry.return_cheque(id).unwrap();
    let cheque = h.registry.get(id).unwrap();
    assert_eq!(cheque.state(), ChequeState::Returned);
    assert_eq!(cheque.return_date(), Some(h.clock.today()));
    assert!(cheque.postings().is_empty());
    for posting in postings {
        assert_eq!(h.ledger.status(posting), Some(PostingStatus::Cancelled));
    }
}

#[test]
fn revert_out_of_bounced_clears_the_flag() {
    let mut h = harness();
    let id = new_cheque(&mut h);
    h.registry.register(id).unwrap();
    h.registry.bounce(id, BounceReason::Other).unwrap();
    h.registry.revert_to_previous(id).unwrap();

    let cheque = h.registry.get(id).unwrap();
    assert_eq!(cheque.state(), ChequeState::Registered);
    assert!(!cheque.is_bounced());
    assert_eq!(cheque.bounce_reason(), None);
}

#[test]
fn revert_on_a_fresh_draft_stays_in_draft() {
    let mut h = harness();
    let id = new_cheque(&mut h);
    assert_eq!(h.registry.get(id).unwrap().previous_state(), None);

    let step = h.registry.revert_to_previous(id).unwrap();
    assert_eq!((step.from, step.to), (ChequeState::Draft, ChequeState::Draft));

    let cheque = h.registry.get(id).unwrap();
    assert_eq!(cheque.state(), ChequeState::Draft);
    assert_eq!(cheque.previous_state(), Some(ChequeState::Draft));
    assert_eq!(cheque.history().len(), 1);
}

#[test]
fn deposited_cheque_can_be_deposited_again() {
    let mut h = harness();
    let id = new_cheque(&mut h);
    h.registry.register(id).unwrap();
    h.registry.deposit(id, None).unwrap();

    let step = h.registry.deposit(id, Some("1020".to_string())).unwrap();
    assert_eq!(step.from, ChequeState::Deposited);

    let cheque = h.registry.get(id).unwrap();
    assert_eq!(cheque.state(), ChequeState::Deposited);
    assert_eq!(cheque.previous_state(), Some(ChequeState::Deposited));
    assert_eq!(cheque.bank_account(), Some("1020"));
    assert_eq!(cheque.postings().len(), 3);
    let last = h.ledger.entry(cheque.postings()[2]).unwrap();
    assert_eq!(last.request.lines[0].account, "1020");
}

#[test]
fn revert_to_draft_resets_postings() {
    let mut h = harness();
    let id = new_cheque(&mut h);
    h.registry.register(id).unwrap();
    h.registry.deposit(id, None).unwrap();
    let postings = h.registry.get(id).unwrap().postings().to_vec();

    h.registry.revert_to_draft(id).unwrap();
    let cheque = h.registry.get(id).unwrap();
    assert_eq!(cheque.state(), ChequeState::Draft);
    assert_eq!(cheque.previous_state(), Some(ChequeState::Deposited));
    assert!(cheque.postings().is_empty());
    assert!(!cheque.is_category_locked());
    for posting in postings {
        assert_eq!(h.ledger.status(posting), Some(PostingStatus::Draft));
    }
}

#[test]
fn failed_posting_leaves_cheque_untouched() {
    let mut h = harness();
    let id = new_cheque(&mut h);
    let before = h.registry.get(id).unwrap().clone();

    h.ledger.set_failing(true);
    assert!(matches!(
        h.registry.register(id),
        Err(ChequeError::Processing { .. })
    ));
    assert_eq!(h.registry.get(id).unwrap(), &before);
}

#[test]
fn rejected_cancellation_changes_no_posting() {
    let mut h = harness();
    let id = new_cheque(&mut h);
    h.registry.register(id).unwrap();
    h.registry.deposit(id, None).unwrap();
    let before = h.registry.get(id).unwrap().clone();
    let postings = before.postings().to_vec();
    assert_eq!(postings.len(), 2);

    h.ledger.reject_updates_for(Some(postings[1]));
    assert!(matches!(
        h.registry.cancel(id),
        Err(ChequeError::Processing { .. })
    ));
    assert!(h.registry.revert_to_draft(id).is_err());

    assert_eq!(h.registry.get(id).unwrap(), &before);
    for posting in &postings {
        assert_eq!(h.ledger.status(*posting), Some(PostingStatus::Posted));
    }

    h.ledger.reject_updates_for(None);
    h.registry.cancel(id).unwrap();
    for posting in &postings {
        assert_eq!(h.ledger.status(*posting), Some(PostingStatus::Cancelled));
    }
}

#[test]
fn branch_transfer_round_trip_notifies_managers() {
    let mut h = harness();
    let id = new_cheque(&mut h);
    h.registry.register(id).unwrap();

    h.registry.transfer(id, "B").unwrap();
    let cheque = h.registry.get(id).unwrap();
    assert_eq!(cheque.transfer_state(), TransferState::Outgoing);
    assert_eq!(cheque.transfer_destination(), Some("B"));
    assert_eq!(h.notifier.sent_to("bob").len(), 1);

    h.registry.receive(id).unwrap();
    let cheque = h.registry.get(id).unwrap();
    assert_eq!(cheque.state(), ChequeState::Registered);
    assert_eq!(cheque.branch(), Some("B"));
    assert_eq!(cheque.transfer_state(), TransferState::Completed);
    assert_eq!(h.notifier.sent_to("alice").len(), 1);
    assert_eq!(cheque.postings().len(), 3);
}

#[test]
fn transfer_to_a_disallowed_branch_is_refused() {
    let mut h = harness();
    let id = h
        .registry
        .create(draft(Direction::Incoming, dec!(10)).with_branch("B"))
        .unwrap();
    h.registry.register(id).unwrap();

    assert!(matches!(
        h.registry.transfer(id, "A"),
        Err(ChequeError::Validation { .. })
    ));
    assert_eq!(h.registry.get(id).unwrap().state(), ChequeState::Registered);
}

#[test]
fn history_keeps_every_step_in_order() {
    let mut h = harness();
    let id = new_cheque(&mut h);
    h.registry.register(id).unwrap();
    h.clock.advance(Duration::days(2));
    h.registry.deposit(id, None).unwrap();
    h.registry.clear(id).unwrap();

    let cheque = h.registry.get(id).unwrap();
    let path: Vec<ChequeState> = cheque.history().get_path().into_iter().copied().collect();
    assert_eq!(
        path,
        vec![
            ChequeState::Draft,
            ChequeState::Registered,
            ChequeState::Deposited,
            ChequeState::Done
        ]
    );
    assert_eq!(
        cheque.history().duration(),
        Some(std::time::Duration::from_secs(2 * 86_400))
    );
    assert_eq!(cheque.cashed_date(), Some(h.clock.today()));
}

#[test]
fn deleting_without_postings_leaves_one_snapshot() {
    let mut h = harness();
    let id = new_cheque(&mut h);
    let now = h.clock.now();

    let snapshot = h.registry.delete(id).unwrap();
    assert_eq!(h.registry.snapshots().len(), 1);
    let stored = h.registry.snapshots().get(snapshot).unwrap();
    assert_eq!(stored.deleted_at, now);
    assert_eq!(stored.original_id, id);

    let restored = h.registry.restore(snapshot).unwrap();
    let cheque = h.registry.get(restored).unwrap();
    assert_eq!(cheque.state(), ChequeState::Draft);
    assert_eq!(cheque.amount(), dec!(1000));
    assert_eq!(cheque.payer(), "Acme");
    assert_eq!(cheque.serial(), "CHQ/IN/00001");
    assert!(h.registry.snapshots().is_empty());
}

#[test]
fn deleting_with_postings_leaves_no_snapshot() {
    let mut h = harness();
    let id = new_cheque(&mut h);
    h.registry.register(id).unwrap();

    assert!(matches!(
        h.registry.delete(id),
        Err(ChequeError::HasPostings { .. })
    ));
    assert!(h.registry.snapshots().is_empty());
}

#[test]
fn restore_refuses_a_serial_taken_in_the_meantime() {
    let mut h = harness();
    let id = new_cheque(&mut h);
    let snapshot = h.registry.delete(id).unwrap();

    let stored = h.registry.snapshots().get(snapshot).unwrap().clone();
    let restored = h.registry.restore(snapshot).unwrap();
    let again = h.registry.import_snapshot(stored);

    assert!(matches!(
        h.registry.restore(again),
        Err(ChequeError::Validation { .. })
    ));
    assert!(h.registry.get(restored).is_ok());
}

#[test]
fn reminder_lead_time_scales_with_amount() {
    let mut h = harness();
    let large = h
        .registry
        .create(draft(Direction::Incoming, dec!(600000000)))
        .unwrap();
    let small = h
        .registry
        .create(draft(Direction::Incoming, dec!(5000000)))
        .unwrap();

    let large_task = h.scheduler.task(TaskKind::DueDateReminder(large)).unwrap();
    let small_task = h.scheduler.task(TaskKind::DueDateReminder(small)).unwrap();
    assert_eq!(large_task.next_run, due() - Duration::days(30));
    assert_eq!(small_task.next_run, due() - Duration::days(2));
    assert_eq!(large_task.interval_days, 1);
}

#[test]
fn due_sweep_only_covers_registered_cheques() {
    let mut h = harness();
    let registered = h
        .registry
        .create(draft(Direction::Incoming, dec!(600000000)))
        .unwrap();
    let _draft_only = h
        .registry
        .create(draft(Direction::Incoming, dec!(600000000)))
        .unwrap();
    h.registry.register(registered).unwrap();

    // Due 2024-07-15, thirty days before is 2024-06-15.
    assert_eq!(h.registry.run_due_reminders().unwrap(), 0);
    h.clock.set(Utc.with_ymd_and_hms(2024, 6, 15, 7, 0, 0).unwrap());
    assert_eq!(h.registry.run_due_reminders().unwrap(), 1);
    assert_eq!(h.notifier.sent_to("treasury").len(), 1);
}

#[test]
fn status_report_and_due_buckets() {
    let mut h = harness();
    // Monday 2024-06-03.
    let today = h.clock.today();
    let make = |h: &mut Harness, due: NaiveDate| {
        h.registry
            .create(ChequeDraft::new(Direction::Incoming, dec!(10), "Acme", due))
            .unwrap()
    };
    let due_today = make(&mut h, today);
    let due_tomorrow = make(&mut h, today + Duration::days(1));
    let due_sunday = make(&mut h, today + Duration::days(6));
    let due_later = make(&mut h, NaiveDate::from_ymd_opt(2024, 6, 28).unwrap());
    let overdue = make(&mut h, today - Duration::days(3));

    let buckets = h.registry.due_buckets();
    assert_eq!(buckets.today, vec![due_today]);
    assert_eq!(buckets.tomorrow, vec![due_tomorrow]);
    assert_eq!(buckets.this_week, vec![due_today, due_tomorrow, due_sunday]);
    assert_eq!(
        buckets.this_month,
        vec![due_today, due_tomorrow, due_sunday, due_later]
    );

    let report = h.registry.status_report(overdue).unwrap();
    assert_eq!(report.days_to_due, -3);
    assert!(report.overdue);
    assert_eq!(report.state, ChequeState::Draft);
    assert!(!h.registry.status_report(due_later).unwrap().overdue);
}
