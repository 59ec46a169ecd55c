use crate::core::State;
use crate::model::{Cheque, ChequeId, ChequeState};
use crate::reminder::DuePeriods;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where a single cheque stands today.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub id: ChequeId,
    pub serial: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub state: ChequeState,
    pub due_date: NaiveDate,
    pub days_to_due: i64,
    pub overdue: bool,
}

impl StatusReport {
    pub(crate) fn for_cheque(cheque: &Cheque, today: NaiveDate) -> Self {
        let days_to_due = cheque.days_to_due(today);
        Self {
            id: cheque.id(),
            serial: cheque.serial().to_string(),
            amount: cheque.amount(),
            state: cheque.state(),
            due_date: cheque.due_date(),
            days_to_due,
            overdue: days_to_due < 0 && !cheque.state().is_final(),
        }
    }
}

/// Cheque ids grouped by due period. A cheque due today also appears in
/// this week and this month.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueBuckets {
    pub today: Vec<ChequeId>,
    pub tomorrow: Vec<ChequeId>,
    pub this_week: Vec<ChequeId>,
    pub this_month: Vec<ChequeId>,
}

impl DueBuckets {
    pub(crate) fn collect<'a>(
        cheques: impl Iterator<Item = &'a Cheque>,
        periods: &DuePeriods,
    ) -> Self {
        let mut buckets = Self::default();
        for cheque in cheques {
            let due = cheque.due_date();
            if due == periods.today {
                buckets.today.push(cheque.id());
            }
            if due == periods.tomorrow {
                buckets.tomorrow.push(cheque.id());
            }
            if periods.in_week(due) {
                buckets.this_week.push(cheque.id());
            }
            if periods.in_month(due) {
                buckets.this_month.push(cheque.id());
            }
        }
        buckets
    }

    pub fn is_empty(&self) -> bool {
        self.today.is_empty()
            && self.tomorrow.is_empty()
            && self.this_week.is_empty()
            && self.this_month.is_empty()
    }
}
