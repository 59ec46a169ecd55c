//! Processing fee schedules.

use crate::error::{ChequeError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// One band of a tiered schedule. `up_to: None` is the open-ended top band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeTier {
    #[serde(with = "rust_decimal::serde::str_option", default)]
    pub up_to: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str")]
    pub fixed: Decimal,
    /// Percent of the amount
    #[serde(with = "rust_decimal::serde::str")]
    pub rate: Decimal,
}

/// Rate reduction once the rolling daily volume reaches `min_volume`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeDiscount {
    #[serde(with = "rust_decimal::serde::str")]
    pub min_volume: Decimal,
    /// Percentage points taken off the base rate
    #[serde(with = "rust_decimal::serde::str")]
    pub discount: Decimal,
}

/// Hours `[start, end)` in UTC during which the peak surcharge applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakHours {
    pub start: u32,
    pub end: u32,
}

impl PeakHours {
    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start && hour < self.end
    }
}

/// How a processor charges for a payment. Rates are percentages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeeSchedule {
    Fixed {
        #[serde(with = "rust_decimal::serde::str")]
        amount: Decimal,
    },
    Percentage {
        #[serde(with = "rust_decimal::serde::str")]
        rate: Decimal,
    },
    Mixed {
        #[serde(with = "rust_decimal::serde::str")]
        fixed: Decimal,
        #[serde(with = "rust_decimal::serde::str")]
        rate: Decimal,
    },
    /// First band whose `up_to` covers the amount applies.
    Tiered { tiers: Vec<FeeTier> },
    /// Base rate, less the best volume discount reached, plus the peak
    /// surcharge inside peak hours. Never below zero.
    Dynamic {
        #[serde(with = "rust_decimal::serde::str")]
        base_rate: Decimal,
        #[serde(default)]
        volume_discounts: Vec<VolumeDiscount>,
        peak_hours: Option<PeakHours>,
        #[serde(with = "rust_decimal::serde::str")]
        peak_surcharge: Decimal,
    },
}

/// Inputs the dynamic schedule depends on.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FeeContext {
    /// Volume already processed in the last 24 hours
    pub daily_volume: Decimal,
    /// Hour of day, 0-23
    pub hour: u32,
}

/// A schedule plus the bounds its result is clamped to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeePolicy {
    pub schedule: FeeSchedule,
    #[serde(with = "rust_decimal::serde::str_option", default)]
    pub min_fee: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str_option", default)]
    pub max_fee: Option<Decimal>,
}

impl FeePolicy {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self {
            schedule,
            min_fee: None,
            max_fee: None,
        }
    }

    pub fn fixed(amount: Decimal) -> Self {
        Self::new(FeeSchedule::Fixed { amount })
    }

    pub fn percentage(rate: Decimal) -> Self {
        Self::new(FeeSchedule::Percentage { rate })
    }

    pub fn mixed(fixed: Decimal, rate: Decimal) -> Self {
        Self::new(FeeSchedule::Mixed { fixed, rate })
    }

    pub fn with_bounds(mut self, min_fee: Option<Decimal>, max_fee: Option<Decimal>) -> Self {
        self.min_fee = min_fee;
        self.max_fee = max_fee;
        self
    }

    /// Fee for `amount`, clamped to the bounds and rounded to cents.
    pub fn calculate(&self, amount: Decimal, context: FeeContext) -> Decimal {
        let raw = match &self.schedule {
            FeeSchedule::Fixed { amount: fee } => *fee,
            FeeSchedule::Percentage { rate } => amount * *rate / HUNDRED,
            FeeSchedule::Mixed { fixed, rate } => *fixed + amount * *rate / HUNDRED,
            FeeSchedule::Tiered { tiers } => tiers
                .iter()
                .find(|tier| tier.up_to.is_none_or(|limit| amount <= limit))
                .map(|tier| tier.fixed + amount * tier.rate / HUNDRED)
                .unwrap_or(Decimal::ZERO),
            FeeSchedule::Dynamic {
                base_rate,
                volume_discounts,
                peak_hours,
                peak_surcharge,
            } => {
                let discount = volume_discounts
                    .iter()
                    .filter(|d| context.daily_volume >= d.min_volume)
                    .map(|d| d.discount)
                    .max()
                    .unwrap_or(Decimal::ZERO);
                let surcharge = match peak_hours {
                    Some(peak) if peak.contains(context.hour) => *peak_surcharge,
                    _ => Decimal::ZERO,
                };
                let rate = (*base_rate - discount + surcharge).max(Decimal::ZERO);
                amount * rate / HUNDRED
            }
        };

        let mut fee = raw;
        if let Some(min) = self.min_fee {
            fee = fee.max(min);
        }
        if let Some(max) = self.max_fee {
            fee = fee.min(max);
        }
        fee.round_dp(2)
    }

    /// Check the schedule and bounds, collecting all problems.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<String>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<String>>> = Vec::new();
        let mut check = |ok: bool, message: &str| {
            checks.push(if ok {
                Validation::success(())
            } else {
                Validation::fail(message.to_string())
            });
        };

        match &self.schedule {
            FeeSchedule::Fixed { amount } => {
                check(*amount > Decimal::ZERO, "fixed fee must be greater than zero")
            }
            FeeSchedule::Percentage { rate } => check(
                *rate > Decimal::ZERO && *rate <= HUNDRED,
                "percentage fee must be between 0 and 100",
            ),
            FeeSchedule::Mixed { fixed, rate } => check(
                *fixed > Decimal::ZERO && *rate > Decimal::ZERO,
                "both fixed and percentage fees must be greater than zero for a mixed fee",
            ),
            FeeSchedule::Tiered { tiers } => {
                check(!tiers.is_empty(), "tiered fee needs at least one tier");
                let bounds: Vec<Option<Decimal>> = tiers.iter().map(|t| t.up_to).collect();
                let open_only_last = bounds
                    .iter()
                    .take(bounds.len().saturating_sub(1))
                    .all(Option::is_some);
                check(open_only_last, "only the last tier may be open-ended");
                let ascending = bounds
                    .iter()
                    .flatten()
                    .zip(bounds.iter().flatten().skip(1))
                    .all(|(a, b)| a < b);
                check(ascending, "tier bounds must be strictly ascending");
                check(
                    tiers
                        .iter()
                        .all(|t| t.fixed >= Decimal::ZERO && t.rate >= Decimal::ZERO),
                    "tier fees must not be negative",
                );
            }
            FeeSchedule::Dynamic {
                base_rate,
                volume_discounts,
                peak_hours,
                peak_surcharge,
            } => {
                check(
                    *base_rate > Decimal::ZERO && *base_rate <= HUNDRED,
                    "base rate must be between 0 and 100",
                );
                check(
                    volume_discounts.iter().all(|d| d.discount >= Decimal::ZERO),
                    "volume discounts must not be negative",
                );
                check(
                    *peak_surcharge >= Decimal::ZERO,
                    "peak surcharge must not be negative",
                );
                check(
                    peak_hours.is_none_or(|p| p.start < p.end && p.end <= 24),
                    "peak hours must be a non-empty range within the day",
                );
            }
        }

        check(
            self.min_fee.is_none_or(|m| m >= Decimal::ZERO),
            "minimum fee must not be negative",
        );
        if let (Some(min), Some(max)) = (self.min_fee, self.max_fee) {
            check(min <= max, "minimum fee must not exceed maximum fee");
        }

        Validation::all_vec(checks).map(|_| ())
    }

    pub(crate) fn ensure_valid(&self) -> Result<()> {
        match self.validate() {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => Err(ChequeError::from_violations(errors.iter())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ctx() -> FeeContext {
        FeeContext::default()
    }

    #[test]
    fn simple_schedules() {
        assert_eq!(FeePolicy::fixed(dec!(2.5)).calculate(dec!(1000), ctx()), dec!(2.50));
        assert_eq!(
            FeePolicy::percentage(dec!(1.5)).calculate(dec!(1000), ctx()),
            dec!(15.00)
        );
        assert_eq!(
            FeePolicy::mixed(dec!(1), dec!(2)).calculate(dec!(250), ctx()),
            dec!(6.00)
        );
    }

    #[test]
    fn fee_is_clamped_and_rounded() {
        let policy = FeePolicy::percentage(dec!(1)).with_bounds(Some(dec!(5)), Some(dec!(20)));
        assert_eq!(policy.calculate(dec!(100), ctx()), dec!(5));
        assert_eq!(policy.calculate(dec!(10000), ctx()), dec!(20));
        assert_eq!(policy.calculate(dec!(1234.567), ctx()), dec!(12.35));
    }

    #[test]
    fn tiered_picks_first_covering_band() {
        let policy = FeePolicy::new(FeeSchedule::Tiered {
            tiers: vec![
                FeeTier {
                    up_to: Some(dec!(1000)),
                    fixed: dec!(1),
                    rate: dec!(0),
                },
                FeeTier {
                    up_to: Some(dec!(10000)),
                    fixed: dec!(0),
                    rate: dec!(1),
                },
                FeeTier {
                    up_to: None,
                    fixed: dec!(50),
                    rate: dec!(0.5),
                },
            ],
        });

        assert!(policy.validate().is_success());
        assert_eq!(policy.calculate(dec!(1000), ctx()), dec!(1));
        assert_eq!(policy.calculate(dec!(5000), ctx()), dec!(50));
        assert_eq!(policy.calculate(dec!(20000), ctx()), dec!(150));
    }

    #[test]
    fn dynamic_applies_discount_and_peak_surcharge() {
        let policy = FeePolicy::new(FeeSchedule::Dynamic {
            base_rate: dec!(2),
            volume_discounts: vec![
                VolumeDiscount {
                    min_volume: dec!(10000),
                    discount: dec!(0.5),
                },
                VolumeDiscount {
                    min_volume: dec!(50000),
                    discount: dec!(1),
                },
            ],
            peak_hours: Some(PeakHours { start: 9, end: 17 }),
            peak_surcharge: dec!(0.25),
        });

        let quiet = FeeContext {
            daily_volume: dec!(0),
            hour: 3,
        };
        let busy_peak = FeeContext {
            daily_volume: dec!(60000),
            hour: 10,
        };

        assert_eq!(policy.calculate(dec!(1000), quiet), dec!(20));
        assert_eq!(policy.calculate(dec!(1000), busy_peak), dec!(12.50));
    }

    #[test]
    fn dynamic_rate_never_goes_negative() {
        let policy = FeePolicy::new(FeeSchedule::Dynamic {
            base_rate: dec!(1),
            volume_discounts: vec![VolumeDiscount {
                min_volume: dec!(0),
                discount: dec!(3),
            }],
            peak_hours: None,
            peak_surcharge: dec!(0),
        });
        assert_eq!(policy.calculate(dec!(1000), ctx()), dec!(0));
    }

    #[test]
    fn validation_mirrors_fee_type_rules() {
        assert!(FeePolicy::fixed(dec!(0)).validate().is_failure());
        assert!(FeePolicy::percentage(dec!(0)).validate().is_failure());
        assert!(FeePolicy::percentage(dec!(100)).validate().is_success());
        assert!(FeePolicy::percentage(dec!(100.01)).validate().is_failure());
        assert!(FeePolicy::mixed(dec!(1), dec!(0)).validate().is_failure());
    }

    #[test]
    fn validation_collects_every_problem() {
        let policy = FeePolicy::new(FeeSchedule::Tiered {
            tiers: vec![
                FeeTier {
                    up_to: None,
                    fixed: dec!(1),
                    rate: dec!(0),
                },
                FeeTier {
                    up_to: Some(dec!(10)),
                    fixed: dec!(-1),
                    rate: dec!(0),
                },
            ],
        })
        .with_bounds(Some(dec!(10)), Some(dec!(5)));

        match policy.validate() {
            Validation::Failure(errors) => assert_eq!(errors.len(), 3),
            Validation::Success(_) => panic!("expected failures"),
        }
    }

    #[test]
    fn schedule_serializes_with_type_tag() {
        let json = serde_json::to_value(FeePolicy::mixed(dec!(1), dec!(2.5))).unwrap();
        assert_eq!(json["schedule"]["type"], "mixed");
        assert_eq!(json["schedule"]["rate"], "2.5");
    }
}
