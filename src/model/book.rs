//! Cheque books: numeric serial ranges and leaf issuance.

use crate::core::State;
use crate::error::{ChequeError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::{debug, info};

/// Remaining-leaf count at or below which issuance reports low inventory.
pub const DEFAULT_LOW_WATER_MARK: u64 = 5;

/// Largest book whose leaves can be generated up front on activation.
pub const MAX_GENERATED_LEAVES: u64 = 10_000;

crate::state_enum! {
    /// Lifecycle of a cheque book.
    pub enum BookStatus {
        Draft => "draft",
        Active => "active",
        Depleted => "depleted",
        Cancelled => "cancelled",
    }
    final: [Depleted, Cancelled]
    error: [Cancelled]
}

/// Inclusive numeric range rendered at a fixed width.
///
/// The width comes from the configured start string and never changes, so
/// `"0009"` + 1 renders as `"0010"`, not `"10"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialRange {
    start: u64,
    end: u64,
    width: usize,
}

impl SerialRange {
    /// Range of `count` numbers beginning at `start`.
    pub fn parse(start: &str, count: u64) -> Result<Self> {
        let first = parse_number(start)?;
        if count < 2 {
            return Err(ChequeError::validation(format!(
                "a serial range needs at least two numbers, got {count}"
            )));
        }
        let end = first
            .checked_add(count - 1)
            .ok_or_else(|| ChequeError::validation("serial range overflows"))?;
        Ok(Self {
            start: first,
            end,
            width: start.trim().len(),
        })
    }

    /// Range between two explicit bounds; width follows `start`.
    pub fn from_bounds(start: &str, end: &str) -> Result<Self> {
        let first = parse_number(start)?;
        let last = parse_number(end)?;
        if first >= last {
            return Err(ChequeError::validation(format!(
                "serial range start {first} must be below end {last}"
            )));
        }
        Ok(Self {
            start: first,
            end: last,
            width: start.trim().len(),
        })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn capacity(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn render(&self, value: u64) -> String {
        format!("{:0width$}", value, width = self.width)
    }

    /// Rendered number at `offset` from the start, if inside the range.
    pub fn nth(&self, offset: u64) -> Option<String> {
        let value = self.start.checked_add(offset)?;
        (value <= self.end).then(|| self.render(value))
    }

    pub fn first(&self) -> String {
        self.render(self.start)
    }

    pub fn last(&self) -> String {
        self.render(self.end)
    }
}

fn parse_number(raw: &str) -> Result<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(ChequeError::validation(format!(
            "serial number '{raw}' must contain only digits"
        )));
    }
    trimmed
        .parse::<u64>()
        .map_err(|e| ChequeError::validation(format!("serial number '{raw}': {e}")))
}

/// A blank cheque carved from a book's range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    pub serial: String,
    pub tracking_number: Option<String>,
    pub issued: bool,
}

/// Result of drawing the next leaf from a book.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedLeaf {
    pub book: String,
    pub serial: String,
    pub tracking_number: Option<String>,
    pub remaining: u64,
    pub low_inventory: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChequeBook {
    name: String,
    bank_name: String,
    account_number: String,
    branch_code: Option<String>,
    serials: SerialRange,
    tracking: Option<SerialRange>,
    issued_count: u64,
    status: BookStatus,
    issue_date: Option<NaiveDate>,
    leaves: Vec<Leaf>,
}

impl ChequeBook {
    /// Create a book in `draft`. Every problem with the inputs is reported
    /// at once.
    pub fn new(
        name: impl Into<String>,
        bank_name: impl Into<String>,
        account_number: impl Into<String>,
        serials: SerialRange,
        tracking: Option<SerialRange>,
    ) -> Result<Self> {
        let book = Self {
            name: name.into(),
            bank_name: bank_name.into(),
            account_number: account_number.into(),
            branch_code: None,
            serials,
            tracking,
            issued_count: 0,
            status: BookStatus::Draft,
            issue_date: None,
            leaves: Vec::new(),
        };

        match book.validate() {
            Validation::Success(_) => Ok(book),
            Validation::Failure(errors) => Err(ChequeError::from_violations(errors.iter())),
        }
    }

    pub fn with_branch(mut self, code: impl Into<String>) -> Self {
        self.branch_code = Some(code.into());
        self
    }

    fn validate(&self) -> Validation<(), NonEmptyVec<String>> {
        let required = |value: &str, field: &str| {
            if value.trim().is_empty() {
                Validation::fail(format!("{field} is required"))
            } else {
                Validation::success(())
            }
        };

        let tracking_capacity = match &self.tracking {
            Some(tracking) if tracking.capacity() != self.serials.capacity() => {
                Validation::fail(format!(
                    "tracking range holds {} numbers but serial range holds {}",
                    tracking.capacity(),
                    self.serials.capacity()
                ))
            }
            _ => Validation::success(()),
        };

        Validation::all_vec(vec![
            required(&self.name, "book name"),
            required(&self.bank_name, "bank name"),
            required(&self.account_number, "account number"),
            tracking_capacity,
        ])
        .map(|_| ())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bank_name(&self) -> &str {
        &self.bank_name
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn branch_code(&self) -> Option<&str> {
        self.branch_code.as_deref()
    }

    pub fn serials(&self) -> &SerialRange {
        &self.serials
    }

    pub fn tracking(&self) -> Option<&SerialRange> {
        self.tracking.as_ref()
    }

    pub fn status(&self) -> BookStatus {
        self.status
    }

    pub fn issued_count(&self) -> u64 {
        self.issued_count
    }

    pub fn issue_date(&self) -> Option<NaiveDate> {
        self.issue_date
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    pub fn capacity(&self) -> u64 {
        self.serials.capacity()
    }

    pub fn remaining(&self) -> u64 {
        self.capacity().saturating_sub(self.issued_count)
    }

    /// Move a draft book to `active`, optionally generating every leaf.
    pub fn activate(&mut self, today: NaiveDate, generate_leaves: bool) -> Result<&[Leaf]> {
        if self.status != BookStatus::Draft {
            return Err(ChequeError::guard(
                "activate cheque book",
                self.status.name(),
                "only draft books can be activated",
            ));
        }
        if generate_leaves && self.capacity() > MAX_GENERATED_LEAVES {
            return Err(ChequeError::validation(format!(
                "book {} holds {} leaves; at most {MAX_GENERATED_LEAVES} can be generated",
                self.name,
                self.capacity()
            )));
        }

        self.status = BookStatus::Active;
        self.issue_date.get_or_insert(today);

        if generate_leaves {
            self.leaves = (0..self.capacity())
                .filter_map(|offset| {
                    let serial = self.serials.nth(offset)?;
                    let tracking_number = self.tracking.as_ref().and_then(|t| t.nth(offset));
                    Some(Leaf {
                        serial,
                        tracking_number,
                        issued: false,
                    })
                })
                .collect();
        }

        info!(book = %self.name, leaves = self.leaves.len(), "cheque book activated");
        Ok(&self.leaves)
    }

    /// Issue the next serial with the default low-water mark.
    pub fn get_next_serial(&mut self) -> Result<String> {
        self.issue_leaf(DEFAULT_LOW_WATER_MARK)
            .map(|issued| issued.serial)
    }

    /// Issue the next leaf: serial, parallel tracking number, and inventory.
    ///
    /// The caller must hold exclusive access to the book for the whole call;
    /// [`ChequeBookAllocator`](crate::allocator::ChequeBookAllocator) does
    /// this with a per-book lock.
    pub fn issue_leaf(&mut self, low_water_mark: u64) -> Result<IssuedLeaf> {
        if self.status == BookStatus::Depleted || self.remaining() == 0 {
            return Err(ChequeError::Depleted {
                book: self.name.clone(),
            });
        }
        if self.status != BookStatus::Active {
            return Err(ChequeError::Inactive {
                book: self.name.clone(),
                status: self.status.name().to_string(),
            });
        }

        let offset = self.issued_count;
        let serial = self.serials.render(self.serials.start() + offset);
        let tracking_number = self.tracking.as_ref().and_then(|t| t.nth(offset));

        self.issued_count += 1;
        if let Some(leaf) = self.leaves.get_mut(offset as usize) {
            leaf.issued = true;
        }

        let remaining = self.remaining();
        if remaining == 0 {
            self.status = BookStatus::Depleted;
        }

        debug!(book = %self.name, %serial, remaining, "leaf issued");
        Ok(IssuedLeaf {
            book: self.name.clone(),
            serial,
            tracking_number,
            remaining,
            low_inventory: remaining > 0 && remaining <= low_water_mark,
        })
    }

    /// Return an untouched book to `draft`, dropping its blank leaves.
    /// Returns how many leaves were dropped.
    pub fn revert_to_draft(&mut self) -> Result<usize> {
        self.ensure_nothing_issued()?;
        let dropped = self.leaves.len();
        self.leaves.clear();
        self.status = BookStatus::Draft;
        info!(book = %self.name, dropped, "cheque book reverted to draft");
        Ok(dropped)
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.ensure_nothing_issued()?;
        self.status = BookStatus::Cancelled;
        info!(book = %self.name, "cheque book cancelled");
        Ok(())
    }

    fn ensure_nothing_issued(&self) -> Result<()> {
        if self.issued_count > 0 {
            return Err(ChequeError::HasIssuedCheques {
                book: self.name.clone(),
                issued: self.issued_count,
            });
        }
        Ok(())
    }
}
