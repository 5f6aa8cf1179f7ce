use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::domain::calendar::count_working_days;
use crate::domain::period::{Period, TimePeriodType};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapacityError {
    #[error("period {period} has no working days")]
    NoWorkingDays { period: String },
    #[error("period {period} has no valid calendar bounds")]
    InvalidPeriod { period: String },
}

/// Capacity and working-day figures for the period containing a date.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodInfo {
    pub period_id: String,
    pub working_days: u32,
    pub total_capacity: f64,
    pub capacity_per_working_day: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodCapacity {
    pub period: String,
    pub label: String,
    pub capacity: f64,
    pub working_days: u32,
    pub overridden: bool,
}

/// Period arithmetic and capacity lookup for one granularity.
///
/// Overrides are keyed by canonical period identifier (`2025-Q1`,
/// `2025-03`); periods without an override fall back to the default
/// quarterly capacity, divided by three for monthly granularity.
#[derive(Debug, Clone)]
pub struct CapacityCalculator {
    period_type: TimePeriodType,
    default_capacity_per_quarter: f64,
    overrides: HashMap<String, f64>,
}

impl CapacityCalculator {
    pub fn new(period_type: TimePeriodType, default_capacity_per_quarter: f64) -> Self {
        Self {
            period_type,
            default_capacity_per_quarter,
            overrides: HashMap::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: HashMap<String, f64>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    pub fn period_type(&self) -> TimePeriodType {
        self.period_type
    }

    pub fn overrides(&self) -> &HashMap<String, f64> {
        &self.overrides
    }

    pub fn set_override(&mut self, period_id: impl Into<String>, capacity: f64) {
        self.overrides.insert(period_id.into(), capacity);
    }

    pub fn default_capacity(&self) -> f64 {
        match self.period_type {
            TimePeriodType::Quarterly => self.default_capacity_per_quarter,
            TimePeriodType::Monthly => self.default_capacity_per_quarter / 3.0,
        }
    }

    pub fn period_identifier(&self, date: NaiveDate) -> String {
        Period::containing(date, self.period_type).to_string()
    }

    pub fn working_days_in_period(&self, year: i32, period_number: u32) -> Result<u32, CapacityError> {
        let period = Period::new(year, period_number, self.period_type).map_err(|_| {
            CapacityError::InvalidPeriod {
                period: format!("{year}/{period_number}"),
            }
        })?;
        working_days_in(&period)
    }

    /// Override for `period_id` if present, otherwise `fallback`.
    pub fn period_total(&self, period_id: &str, fallback: f64) -> f64 {
        self.overrides.get(period_id).copied().unwrap_or(fallback)
    }

    pub fn period_info(&self, date: NaiveDate) -> Result<PeriodInfo, CapacityError> {
        self.period_info_with_fallback(date, self.default_capacity())
    }

    pub fn period_info_with_fallback(
        &self,
        date: NaiveDate,
        fallback: f64,
    ) -> Result<PeriodInfo, CapacityError> {
        let period = Period::containing(date, self.period_type);
        let period_id = period.to_string();
        let working_days = working_days_in(&period)?;
        let total_capacity = self.period_total(&period_id, fallback);
        Ok(PeriodInfo {
            capacity_per_working_day: total_capacity / working_days as f64,
            period_id,
            working_days,
            total_capacity,
        })
    }

    /// Weekdays from `date` (inclusive) to the end of its period.
    pub fn remaining_working_days_in_period(&self, date: NaiveDate) -> Result<u32, CapacityError> {
        let period = Period::containing(date, self.period_type);
        let end = period.last_day().ok_or_else(|| CapacityError::InvalidPeriod {
            period: period.to_string(),
        })?;
        Ok(count_working_days(date, end))
    }

    /// Share of `total_capacity_for_period` left from `date` onward, assuming
    /// capacity is spread evenly over the period's working days.
    pub fn remaining_capacity(
        &self,
        date: NaiveDate,
        total_capacity_for_period: f64,
    ) -> Result<(String, f64), CapacityError> {
        let period = Period::containing(date, self.period_type);
        let working_days = working_days_in(&period)?;
        let remaining_days = self.remaining_working_days_in_period(date)?;
        let remaining = total_capacity_for_period * remaining_days as f64 / working_days as f64;
        Ok((period.to_string(), remaining))
    }

    pub fn capacity_timeline(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PeriodCapacity>, CapacityError> {
        let default_capacity = self.default_capacity();
        Period::range(from, to, self.period_type)
            .into_iter()
            .map(|period| {
                let id = period.to_string();
                let overridden = self.overrides.contains_key(&id);
                Ok(PeriodCapacity {
                    capacity: self.period_total(&id, default_capacity),
                    working_days: working_days_in(&period)?,
                    label: period.display_label(),
                    period: id,
                    overridden,
                })
            })
            .collect()
    }
}

fn working_days_in(period: &Period) -> Result<u32, CapacityError> {
    let invalid = || CapacityError::InvalidPeriod {
        period: period.to_string(),
    };
    let start = period.first_day().ok_or_else(invalid)?;
    let end = period.last_day().ok_or_else(invalid)?;
    match count_working_days(start, end) {
        0 => Err(CapacityError::NoWorkingDays {
            period: period.to_string(),
        }),
        days => Ok(days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::on_date;

    fn quarterly() -> CapacityCalculator {
        CapacityCalculator::new(TimePeriodType::Quarterly, 1300.0)
    }

    fn monthly() -> CapacityCalculator {
        CapacityCalculator::new(TimePeriodType::Monthly, 1300.0)
    }

    #[test]
    fn counts_working_days_per_quarter() {
        let calculator = quarterly();
        // 2025: Jan 23 + Feb 20 + Mar 21
        assert_eq!(calculator.working_days_in_period(2025, 1), Ok(64));
        // 2024: Oct 23 + Nov 21 + Dec 22
        assert_eq!(calculator.working_days_in_period(2024, 4), Ok(66));
    }

    #[test]
    fn counts_working_days_per_month() {
        let calculator = monthly();
        assert_eq!(calculator.working_days_in_period(2025, 2), Ok(20));
        assert_eq!(calculator.working_days_in_period(2024, 2), Ok(21));
        assert_eq!(calculator.working_days_in_period(2025, 12), Ok(23));
    }

    #[test]
    fn rejects_out_of_range_period_numbers() {
        assert!(matches!(
            quarterly().working_days_in_period(2025, 5),
            Err(CapacityError::InvalidPeriod { .. })
        ));
        assert!(matches!(
            monthly().working_days_in_period(2025, 0),
            Err(CapacityError::InvalidPeriod { .. })
        ));
    }

    #[test]
    fn period_identifier_follows_granularity() {
        let date = on_date(2025, 8, 14);
        assert_eq!(quarterly().period_identifier(date), "2025-Q3");
        assert_eq!(monthly().period_identifier(date), "2025-08");
    }

    #[test]
    fn period_info_uses_default_capacity() {
        let info = quarterly().period_info(on_date(2025, 2, 3)).unwrap();
        assert_eq!(info.period_id, "2025-Q1");
        assert_eq!(info.working_days, 64);
        assert_eq!(info.total_capacity, 1300.0);
        assert!((info.capacity_per_working_day - 1300.0 / 64.0).abs() < 1e-9);
    }

    #[test]
    fn monthly_default_is_a_third_of_the_quarter() {
        let info = monthly().period_info(on_date(2025, 2, 3)).unwrap();
        assert_eq!(info.period_id, "2025-02");
        assert!((info.total_capacity - 1300.0 / 3.0).abs() < 1e-9);
        assert!((info.capacity_per_working_day - 1300.0 / 3.0 / 20.0).abs() < 1e-9);
    }

    #[test]
    fn override_round_trips_through_period_identifier() {
        let mut calculator = quarterly();
        let date = on_date(2025, 5, 20);
        let period_id = calculator.period_identifier(date);
        calculator.set_override(period_id, 2600.0);

        let info = calculator.period_info(date).unwrap();
        assert_eq!(info.total_capacity, 2600.0);

        let other = calculator.period_info(on_date(2025, 8, 1)).unwrap();
        assert_eq!(other.total_capacity, 1300.0);
    }

    #[test]
    fn set_override_replaces_previous_value() {
        let mut calculator =
            monthly().with_overrides(HashMap::from([("2025-03".to_string(), 100.0)]));
        calculator.set_override("2025-03", 50.0);
        assert_eq!(calculator.period_total("2025-03", 400.0), 50.0);
        assert_eq!(calculator.period_total("2025-04", 400.0), 400.0);
    }

    #[test]
    fn remaining_working_days_include_the_start_date() {
        let calculator = quarterly();
        // Wed 2025-12-31 is the last working day of Q4
        assert_eq!(
            calculator.remaining_working_days_in_period(on_date(2025, 12, 31)),
            Ok(1)
        );
        // Mon 2025-01-06: Jan 1-3 already passed
        assert_eq!(
            calculator.remaining_working_days_in_period(on_date(2025, 1, 6)),
            Ok(61)
        );
        // Sat 2025-03-29: only Mon 31st remains
        assert_eq!(
            calculator.remaining_working_days_in_period(on_date(2025, 3, 29)),
            Ok(1)
        );
    }

    #[test]
    fn remaining_capacity_is_proportional_to_remaining_days() {
        let calculator = quarterly();
        let (period_id, remaining) = calculator
            .remaining_capacity(on_date(2025, 1, 6), 1000.0)
            .unwrap();
        assert_eq!(period_id, "2025-Q1");
        assert!((remaining - 1000.0 * 61.0 / 64.0).abs() < 1e-9);

        let (_, full) = calculator
            .remaining_capacity(on_date(2025, 1, 1), 1000.0)
            .unwrap();
        assert!((full - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn capacity_timeline_marks_overrides() {
        let mut calculator = quarterly();
        calculator.set_override("2025-Q2", 650.0);

        let timeline = calculator
            .capacity_timeline(on_date(2025, 1, 15), on_date(2025, 9, 1))
            .unwrap();

        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline[0].label, "Q1 2025");
        assert_eq!(timeline[0].capacity, 1300.0);
        assert!(!timeline[0].overridden);
        assert_eq!(timeline[1].period, "2025-Q2");
        assert_eq!(timeline[1].capacity, 650.0);
        assert!(timeline[1].overridden);
    }
}
