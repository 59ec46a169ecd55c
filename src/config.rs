//! TOML configuration. Every section and key has a default.

use crate::error::{ChequeError, Result};
use crate::model::{Direction, DEFAULT_LOW_WATER_MARK};
use crate::reminder::{ReminderPolicy, ReminderTier, MAX_DAYS_BEFORE};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChequeConfig {
    pub allocator: AllocatorConfig,
    pub reminders: ReminderConfig,
    pub archive: ArchiveConfig,
    pub sequences: SequenceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    pub low_water_mark: u64,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            low_water_mark: DEFAULT_LOW_WATER_MARK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub interval_days: u32,
    pub tiers: Vec<ReminderTier>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        let policy = ReminderPolicy::default();
        Self {
            interval_days: policy.interval_days(),
            tiers: policy.tiers().to_vec(),
        }
    }
}

/// Upper bound for `archive.retention_days`, about a century.
pub const MAX_RETENTION_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// How long deleted cheques can still be restored.
    pub retention_days: i64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self { retention_days: 7 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub incoming_prefix: String,
    pub outgoing_prefix: String,
    pub padding: usize,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            incoming_prefix: "CHQ/IN/".to_string(),
            outgoing_prefix: "CHQ/OUT/".to_string(),
            padding: 5,
        }
    }
}

impl SequenceConfig {
    /// Render a sequence value as a cheque serial, e.g. `CHQ/IN/00042`.
    pub fn format(&self, direction: Direction, value: u64) -> String {
        let prefix = match direction {
            Direction::Incoming => &self.incoming_prefix,
            Direction::Outgoing => &self.outgoing_prefix,
        };
        format!("{prefix}{value:0width$}", width = self.padding)
    }
}

impl ChequeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ChequeError::Config {
            message: format!("TOML parsing error: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ChequeError::Config {
            message: format!("TOML serialization error: {e}"),
        })
    }

    /// Check every setting, reporting all problems together.
    pub fn validate(&self) -> Result<()> {
        let check = |ok: bool, message: &str| {
            if ok {
                Validation::success(())
            } else {
                Validation::fail(message.to_string())
            }
        };

        let checks: Vec<Validation<(), NonEmptyVec<String>>> = vec![
            check(
                self.reminders.interval_days > 0,
                "reminders.interval_days must be at least 1",
            ),
            check(
                !self.reminders.tiers.is_empty(),
                "reminders.tiers must not be empty",
            ),
            check(
                self.reminders
                    .tiers
                    .iter()
                    .all(|t| !t.min_amount.is_sign_negative()),
                "reminders.tiers min_amount must not be negative",
            ),
            check(
                self.reminders
                    .tiers
                    .iter()
                    .all(|t| t.days_before <= MAX_DAYS_BEFORE),
                &format!("reminders.tiers days_before must not exceed {MAX_DAYS_BEFORE}"),
            ),
            check(
                (1..=MAX_RETENTION_DAYS).contains(&self.archive.retention_days),
                &format!("archive.retention_days must be between 1 and {MAX_RETENTION_DAYS}"),
            ),
            check(self.sequences.padding > 0, "sequences.padding must be positive"),
            check(
                self.sequences.incoming_prefix != self.sequences.outgoing_prefix,
                "sequences prefixes must differ between incoming and outgoing",
            ),
        ];

        match Validation::all_vec(checks) {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => Err(ChequeError::Config {
                message: errors.iter().cloned().collect::<Vec<_>>().join("; "),
            }),
        }
    }

    pub fn reminder_policy(&self) -> Result<ReminderPolicy> {
        ReminderPolicy::new(self.reminders.tiers.clone(), self.reminders.interval_days)
    }

    /// Out-of-range values saturate; `validate` rejects them first.
    pub fn retention(&self) -> Duration {
        Duration::try_days(self.archive.retention_days).unwrap_or(Duration::MAX)
    }
}
