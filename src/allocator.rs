//! Shared, thread-safe access to cheque books.
//!
//! Each book sits behind its own mutex. Drawing a leaf holds that lock for
//! the whole check, increment and render sequence, so concurrent callers
//! never see the same serial while other books stay available.

use crate::error::{ChequeError, Result};
use crate::model::{ChequeBook, IssuedLeaf, Leaf, DEFAULT_LOW_WATER_MARK};
use crate::ports::{Notification, Notifier};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{info, warn};

type SharedBook = Arc<Mutex<ChequeBook>>;

fn lock(book: &Mutex<ChequeBook>) -> MutexGuard<'_, ChequeBook> {
    book.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct ChequeBookAllocator {
    books: RwLock<HashMap<String, SharedBook>>,
    notifier: Arc<dyn Notifier>,
    low_water_mark: u64,
    inventory_recipient: String,
}

impl ChequeBookAllocator {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            notifier,
            low_water_mark: DEFAULT_LOW_WATER_MARK,
            inventory_recipient: "treasury".to_string(),
        }
    }

    pub fn with_low_water_mark(mut self, mark: u64) -> Self {
        self.low_water_mark = mark;
        self
    }

    /// Who hears about books running low.
    pub fn with_inventory_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.inventory_recipient = recipient.into();
        self
    }

    pub fn low_water_mark(&self) -> u64 {
        self.low_water_mark
    }

    /// Register a book. Names are unique.
    pub fn add_book(&self, book: ChequeBook) -> Result<()> {
        let mut books = self
            .books
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if books.contains_key(book.name()) {
            return Err(ChequeError::validation(format!(
                "cheque book '{}' already exists",
                book.name()
            )));
        }
        info!(book = %book.name(), capacity = book.capacity(), "cheque book added");
        books.insert(book.name().to_string(), Arc::new(Mutex::new(book)));
        Ok(())
    }

    fn shared(&self, name: &str) -> Result<SharedBook> {
        self.books
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| ChequeError::not_found("cheque book", name))
    }

    /// Activate a draft book, returning the generated leaves (if any).
    pub fn activate(
        &self,
        name: &str,
        today: NaiveDate,
        generate_leaves: bool,
    ) -> Result<Vec<Leaf>> {
        let book = self.shared(name)?;
        let mut book = lock(&book);
        let leaves = book.activate(today, generate_leaves)?.to_vec();
        info!(book = %name, leaves = leaves.len(), "cheque book activated");
        Ok(leaves)
    }

    /// Draw the next leaf from `name`.
    ///
    /// A low-inventory notification is sent after the lock is released;
    /// failing to deliver it does not undo the issuance.
    pub fn next_leaf(&self, name: &str) -> Result<IssuedLeaf> {
        let book = self.shared(name)?;
        let issued = lock(&book).issue_leaf(self.low_water_mark)?;

        if issued.remaining == 0 {
            warn!(book = %name, "cheque book depleted");
        } else if issued.low_inventory {
            let notification = Notification::new(
                &self.inventory_recipient,
                "Low cheque inventory",
                format!(
                    "Cheque book {name} has only {} leaves remaining.",
                    issued.remaining
                ),
            );
            if let Err(err) = self.notifier.notify(notification) {
                warn!(book = %name, error = %err, "low inventory notification failed");
            }
        }
        Ok(issued)
    }

    pub fn next_serial(&self, name: &str) -> Result<String> {
        self.next_leaf(name).map(|issued| issued.serial)
    }

    pub fn revert_to_draft(&self, name: &str) -> Result<usize> {
        let book = self.shared(name)?;
        let dropped = lock(&book).revert_to_draft()?;
        Ok(dropped)
    }

    pub fn cancel(&self, name: &str) -> Result<()> {
        let book = self.shared(name)?;
        let mut book = lock(&book);
        book.cancel()
    }

    /// Copy of the book's current state.
    pub fn book(&self, name: &str) -> Result<ChequeBook> {
        let book = self.shared(name)?;
        let snapshot = lock(&book).clone();
        Ok(snapshot)
    }

    /// Copies of every book, sorted by name.
    pub fn books(&self) -> Vec<ChequeBook> {
        let shared: Vec<SharedBook> = self
            .books
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect();
        let mut books: Vec<ChequeBook> = shared.iter().map(|b| lock(b).clone()).collect();
        books.sort_by(|a, b| a.name().cmp(b.name()));
        books
    }
}
