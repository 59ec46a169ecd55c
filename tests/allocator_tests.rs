//! Cheque book issuance, alone and under concurrent use.

use chequeflow::model::{BookStatus, ChequeBook, SerialRange};
use chequeflow::ports::MemoryNotifier;
use chequeflow::{ChequeBookAllocator, ChequeError};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn sixteen_digit_book(name: &str) -> ChequeBook {
    ChequeBook::new(
        name,
        "Melli",
        "0101-22",
        SerialRange::from_bounds("0000000000000001", "0000000000000010").unwrap(),
        None,
    )
    .unwrap()
}

#[test]
fn ten_leaf_book_issues_in_order_then_depletes() {
    let mut book = sixteen_digit_book("Main");
    book.activate(today(), false).unwrap();

    let serials: Vec<String> = (0..10).map(|_| book.get_next_serial().unwrap()).collect();
    let expected: Vec<String> = (1..=10).map(|n| format!("{n:016}")).collect();
    assert_eq!(serials, expected);
    assert_eq!(book.status(), BookStatus::Depleted);

    assert!(matches!(
        book.get_next_serial(),
        Err(ChequeError::Depleted { .. })
    ));
}

#[test]
fn draft_and_cancelled_books_never_issue() {
    let mut draft = sixteen_digit_book("Draft");
    assert!(matches!(
        draft.get_next_serial(),
        Err(ChequeError::Inactive { .. })
    ));

    let mut cancelled = sixteen_digit_book("Cancelled");
    cancelled.cancel().unwrap();
    assert!(matches!(
        cancelled.get_next_serial(),
        Err(ChequeError::Inactive { .. })
    ));
    assert_eq!(cancelled.issued_count(), 0);
}

#[test]
fn tracking_numbers_run_alongside_serials() {
    let mut book = ChequeBook::new(
        "Sayad",
        "Melli",
        "0101-22",
        SerialRange::parse("000001", 3).unwrap(),
        Some(SerialRange::parse("1234000000000000", 3).unwrap()),
    )
    .unwrap();
    let leaves = book.activate(today(), true).unwrap().to_vec();
    assert_eq!(leaves.len(), 3);
    assert_eq!(leaves[2].tracking_number.as_deref(), Some("1234000000000002"));

    let issued = book.issue_leaf(5).unwrap();
    assert_eq!(issued.serial, "000001");
    assert_eq!(issued.tracking_number.as_deref(), Some("1234000000000000"));
    assert!(issued.low_inventory);
}

#[test]
fn mismatched_tracking_range_is_rejected() {
    let result = ChequeBook::new(
        "Broken",
        "Melli",
        "0101-22",
        SerialRange::parse("000001", 10).unwrap(),
        Some(SerialRange::parse("9000", 5).unwrap()),
    );
    assert!(matches!(result, Err(ChequeError::Validation { .. })));
}

#[test]
fn books_are_independent_under_contention() {
    let allocator = ChequeBookAllocator::new(Arc::new(MemoryNotifier::new()));
    for name in ["A", "B"] {
        let book = ChequeBook::new(
            name,
            "Melli",
            "0101-22",
            SerialRange::parse("500000", 100).unwrap(),
            None,
        )
        .unwrap();
        allocator.add_book(book).unwrap();
        allocator.activate(name, today(), false).unwrap();
    }

    let issued: Mutex<Vec<(String, String)>> = Mutex::new(Vec::new());
    std::thread::scope(|scope| {
        for worker in 0..6 {
            let name = if worker % 2 == 0 { "A" } else { "B" };
            let allocator = &allocator;
            let issued = &issued;
            scope.spawn(move || {
                while let Ok(serial) = allocator.next_serial(name) {
                    issued.lock().unwrap().push((name.to_string(), serial));
                }
            });
        }
    });

    let issued = issued.into_inner().unwrap();
    assert_eq!(issued.len(), 200);
    let unique: HashSet<&(String, String)> = issued.iter().collect();
    assert_eq!(unique.len(), 200);
    for book in allocator.books() {
        assert_eq!(book.status(), BookStatus::Depleted);
        assert_eq!(book.issued_count(), 100);
    }
}
