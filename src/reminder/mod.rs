//! Due-date reminders scaled by cheque amount.

use crate::error::{ChequeError, Result};
use crate::model::{Cheque, ChequeId};
use crate::ports::{ScheduledTask, TaskKind};
use chrono::{Datelike, Days, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Longest lead time a tier may ask for, about ten years.
pub const MAX_DAYS_BEFORE: u32 = 3650;

/// Cheques of at least `min_amount` are flagged `days_before` their due date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReminderTier {
    #[serde(with = "rust_decimal::serde::str")]
    pub min_amount: Decimal,
    pub days_before: u32,
}

impl ReminderTier {
    pub fn new(min_amount: Decimal, days_before: u32) -> Self {
        Self {
            min_amount,
            days_before,
        }
    }
}

/// Amount-tiered lead times plus the reminder job interval.
///
/// Tiers are kept sorted by descending `min_amount`; the first tier whose
/// threshold the amount reaches wins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReminderPolicy {
    tiers: Vec<ReminderTier>,
    interval_days: u32,
}

impl ReminderPolicy {
    pub fn new(mut tiers: Vec<ReminderTier>, interval_days: u32) -> Result<Self> {
        if tiers.is_empty() {
            return Err(ChequeError::validation("at least one reminder tier is required"));
        }
        if interval_days == 0 {
            return Err(ChequeError::validation(
                "reminder interval must be at least one day",
            ));
        }
        if let Some(tier) = tiers.iter().find(|t| t.days_before > MAX_DAYS_BEFORE) {
            return Err(ChequeError::validation(format!(
                "reminder tier from {} asks for {} days, the limit is {MAX_DAYS_BEFORE}",
                tier.min_amount, tier.days_before
            )));
        }
        tiers.sort_by(|a, b| b.min_amount.cmp(&a.min_amount));
        Ok(Self {
            tiers,
            interval_days,
        })
    }

    pub fn tiers(&self) -> &[ReminderTier] {
        &self.tiers
    }

    pub fn interval_days(&self) -> u32 {
        self.interval_days
    }

    pub fn days_before(&self, amount: Decimal) -> u32 {
        self.tiers
            .iter()
            .find(|tier| amount >= tier.min_amount)
            .map_or(0, |tier| tier.days_before)
    }

    pub fn trigger_date(&self, amount: Decimal, due: NaiveDate) -> NaiveDate {
        due.checked_sub_days(Days::new(u64::from(self.days_before(amount))))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Whether a reminder should go out for `cheque` on `today`.
    pub fn is_due(&self, cheque: &Cheque, today: NaiveDate) -> bool {
        today >= self.trigger_date(cheque.amount(), cheque.due_date())
    }

    /// Daily job that first runs on the trigger date.
    pub fn task_for(&self, cheque: &Cheque) -> ScheduledTask {
        ScheduledTask {
            name: task_name(cheque.id()),
            kind: TaskKind::DueDateReminder(cheque.id()),
            next_run: self.trigger_date(cheque.amount(), cheque.due_date()),
            interval_days: self.interval_days,
            active: true,
        }
    }
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![
                ReminderTier::new(Decimal::from(500_000_000u64), 30),
                ReminderTier::new(Decimal::from(100_000_000u64), 15),
                ReminderTier::new(Decimal::from(50_000_000u64), 7),
                ReminderTier::new(Decimal::ZERO, 2),
            ],
            interval_days: 1,
        }
    }
}

pub fn task_name(id: ChequeId) -> String {
    format!("Cheque Reminder - {id}")
}

/// Calendar period a due date falls into, relative to today.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DuePeriods {
    pub today: NaiveDate,
    pub tomorrow: NaiveDate,
    pub week: (NaiveDate, NaiveDate),
    pub month: (NaiveDate, NaiveDate),
}

impl DuePeriods {
    /// Weeks start on Monday.
    pub fn around(today: NaiveDate) -> Self {
        let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        let month_start = today.with_day(1).unwrap_or(today);
        let next_month = if month_start.month() == 12 {
            NaiveDate::from_ymd_opt(month_start.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(month_start.year(), month_start.month() + 1, 1)
        };
        let month_end = next_month.map_or(month_start, |d| d - Duration::days(1));

        Self {
            today,
            tomorrow: today + Duration::days(1),
            week: (week_start, week_start + Duration::days(6)),
            month: (month_start, month_end),
        }
    }

    pub fn in_week(&self, date: NaiveDate) -> bool {
        date >= self.week.0 && date <= self.week.1
    }

    pub fn in_month(&self, date: NaiveDate) -> bool {
        date >= self.month.0 && date <= self.month.1
    }
}
