use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::calendar::{ensure_working_day, last_day_of_month};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodParseError {
    #[error("invalid period format: {0} (expected YYYY.QN, YYYY.M, YYYY-QN or YYYY-MM)")]
    InvalidFormat(String),
    #[error("invalid quarter number {0}, must be between 1 and 4")]
    InvalidQuarter(u32),
    #[error("invalid month number {0}, must be between 1 and 12")]
    InvalidMonth(u32),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriodType {
    #[default]
    Quarterly,
    Monthly,
}

impl TimePeriodType {
    pub fn periods_per_year(self) -> u32 {
        match self {
            TimePeriodType::Quarterly => 4,
            TimePeriodType::Monthly => 12,
        }
    }

    fn months_per_period(self) -> u32 {
        match self {
            TimePeriodType::Quarterly => 3,
            TimePeriodType::Monthly => 1,
        }
    }
}

impl fmt::Display for TimePeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimePeriodType::Quarterly => write!(f, "quarterly"),
            TimePeriodType::Monthly => write!(f, "monthly"),
        }
    }
}

/// A quarter or calendar month. `Display` yields the canonical identifier
/// used as the capacity override key: `2025-Q1` or `2025-03`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    pub year: i32,
    pub number: u32,
    pub period_type: TimePeriodType,
}

impl Period {
    pub fn new(
        year: i32,
        number: u32,
        period_type: TimePeriodType,
    ) -> Result<Self, PeriodParseError> {
        match period_type {
            TimePeriodType::Quarterly if !(1..=4).contains(&number) => {
                Err(PeriodParseError::InvalidQuarter(number))
            }
            TimePeriodType::Monthly if !(1..=12).contains(&number) => {
                Err(PeriodParseError::InvalidMonth(number))
            }
            _ => Ok(Self {
                year,
                number,
                period_type,
            }),
        }
    }

    pub fn containing(date: NaiveDate, period_type: TimePeriodType) -> Self {
        let number = match period_type {
            TimePeriodType::Quarterly => (date.month() - 1) / 3 + 1,
            TimePeriodType::Monthly => date.month(),
        };
        Self {
            year: date.year(),
            number,
            period_type,
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        let month = (self.number - 1) * self.period_type.months_per_period() + 1;
        NaiveDate::from_ymd_opt(self.year, month, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        let month = self.number * self.period_type.months_per_period();
        last_day_of_month(self.year, month)
    }

    pub fn first_working_day(&self) -> Option<NaiveDate> {
        self.first_day().map(ensure_working_day)
    }

    pub fn next(&self) -> Self {
        if self.number >= self.period_type.periods_per_year() {
            Self {
                year: self.year + 1,
                number: 1,
                period_type: self.period_type,
            }
        } else {
            Self {
                number: self.number + 1,
                ..*self
            }
        }
    }

    /// All periods touching `[from, to]`, in order. Empty when `from > to`.
    pub fn range(from: NaiveDate, to: NaiveDate, period_type: TimePeriodType) -> Vec<Self> {
        let mut periods = Vec::new();
        if from > to {
            return periods;
        }
        let last = Self::containing(to, period_type);
        let mut current = Self::containing(from, period_type);
        while current <= last {
            periods.push(current);
            current = current.next();
        }
        periods
    }

    /// Parses `2025-Q1` / `2025-03`.
    pub fn parse_canonical(value: &str) -> Result<Self, PeriodParseError> {
        parse_with_separator(value, '-')
    }

    /// Parses spreadsheet-style `2025.Q1` / `2025.3`.
    pub fn parse_human(value: &str) -> Result<Self, PeriodParseError> {
        parse_with_separator(value, '.')
    }

    /// Accepts either form.
    pub fn parse(value: &str) -> Result<Self, PeriodParseError> {
        Self::parse_human(value).or_else(|human_error| match human_error {
            PeriodParseError::InvalidFormat(_) => Self::parse_canonical(value),
            other => Err(other),
        })
    }

    pub fn display_label(&self) -> String {
        match self.period_type {
            TimePeriodType::Quarterly => format!("Q{} {}", self.number, self.year),
            TimePeriodType::Monthly => match self.first_day() {
                Some(day) => day.format("%b %Y").to_string(),
                None => self.to_string(),
            },
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.period_type {
            TimePeriodType::Quarterly => write!(f, "{}-Q{}", self.year, self.number),
            TimePeriodType::Monthly => write!(f, "{}-{:02}", self.year, self.number),
        }
    }
}

fn parse_with_separator(value: &str, separator: char) -> Result<Period, PeriodParseError> {
    let invalid = || PeriodParseError::InvalidFormat(value.to_string());
    let trimmed = value.trim();
    let (year, rest) = trimmed.split_once(separator).ok_or_else(invalid)?;
    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;

    let (digits, period_type) = match rest.strip_prefix(['Q', 'q']) {
        Some(quarter) => (quarter, TimePeriodType::Quarterly),
        None => (rest, TimePeriodType::Monthly),
    };
    let max_digits = match period_type {
        TimePeriodType::Quarterly => 1,
        TimePeriodType::Monthly => 2,
    };
    if digits.is_empty()
        || digits.len() > max_digits
        || !digits.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    let number: u32 = digits.parse().map_err(|_| invalid())?;
    Period::new(year, number, period_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::on_date;

    #[test]
    fn identifiers_use_canonical_format() {
        let date = on_date(2025, 3, 7);
        assert_eq!(
            Period::containing(date, TimePeriodType::Quarterly).to_string(),
            "2025-Q1"
        );
        assert_eq!(
            Period::containing(date, TimePeriodType::Monthly).to_string(),
            "2025-03"
        );
        assert_eq!(
            Period::containing(on_date(2025, 10, 1), TimePeriodType::Quarterly).to_string(),
            "2025-Q4"
        );
    }

    #[test]
    fn period_bounds_cover_whole_months() {
        let q1 = Period::new(2024, 1, TimePeriodType::Quarterly).unwrap();
        assert_eq!(q1.first_day(), Some(on_date(2024, 1, 1)));
        assert_eq!(q1.last_day(), Some(on_date(2024, 3, 31)));

        let feb = Period::new(2024, 2, TimePeriodType::Monthly).unwrap();
        assert_eq!(feb.first_day(), Some(on_date(2024, 2, 1)));
        assert_eq!(feb.last_day(), Some(on_date(2024, 2, 29)));
    }

    #[test]
    fn next_wraps_into_the_following_year() {
        let q4 = Period::new(2025, 4, TimePeriodType::Quarterly).unwrap();
        assert_eq!(q4.next().to_string(), "2026-Q1");

        let december = Period::new(2025, 12, TimePeriodType::Monthly).unwrap();
        assert_eq!(december.next().to_string(), "2026-01");

        let q2 = Period::new(2025, 2, TimePeriodType::Quarterly).unwrap();
        assert_eq!(q2.next().to_string(), "2025-Q3");
    }

    #[test]
    fn first_working_day_skips_weekends() {
        // 2026-08-01 is a Saturday
        let august = Period::new(2026, 8, TimePeriodType::Monthly).unwrap();
        assert_eq!(august.first_working_day(), Some(on_date(2026, 8, 3)));
    }

    #[test]
    fn parses_human_and_canonical_forms() {
        let test_cases = vec![
            ("2025.Q1", "2025-Q1"),
            ("2025.q4", "2025-Q4"),
            ("2025.3", "2025-03"),
            ("2025.12", "2025-12"),
            ("2025-Q2", "2025-Q2"),
            ("2025-07", "2025-07"),
        ];

        for (input, expected) in test_cases {
            let period = Period::parse(input).unwrap();
            assert_eq!(period.to_string(), expected, "parsing {input}");
        }
    }

    #[test]
    fn rejects_out_of_range_and_malformed_periods() {
        assert_eq!(
            Period::parse_human("2025.Q5"),
            Err(PeriodParseError::InvalidQuarter(5))
        );
        assert_eq!(
            Period::parse_human("2025.13"),
            Err(PeriodParseError::InvalidMonth(13))
        );
        assert!(matches!(
            Period::parse("Q1 2025"),
            Err(PeriodParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            Period::parse_canonical("2025.Q1"),
            Err(PeriodParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn periods_order_by_year_then_number() {
        let q4_2024 = Period::new(2024, 4, TimePeriodType::Quarterly).unwrap();
        let q1_2025 = Period::new(2025, 1, TimePeriodType::Quarterly).unwrap();
        let q2_2025 = q1_2025.next();

        assert!(q4_2024 < q1_2025);
        assert!(q1_2025 < q2_2025);
        assert_eq!(q4_2024.next().cmp(&q1_2025), std::cmp::Ordering::Equal);

        let mut periods = vec![q2_2025, q4_2024, q1_2025];
        periods.sort();
        assert_eq!(periods, vec![q4_2024, q1_2025, q2_2025]);
    }

    #[test]
    fn range_lists_every_period_between_dates() {
        let periods = Period::range(
            on_date(2025, 11, 15),
            on_date(2026, 4, 2),
            TimePeriodType::Quarterly,
        );
        let ids: Vec<String> = periods.iter().map(|p| p.to_string()).collect();
        assert_eq!(ids, vec!["2025-Q4", "2026-Q1", "2026-Q2"]);

        let months = Period::range(
            on_date(2025, 11, 15),
            on_date(2026, 1, 2),
            TimePeriodType::Monthly,
        );
        assert_eq!(months.len(), 3);
        assert_eq!(months[2].display_label(), "Jan 2026");
    }
}
