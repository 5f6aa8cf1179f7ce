use chrono::{Datelike, Days, NaiveDate, Weekday};

pub fn is_working_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Rolls a weekend date forward to the following Monday.
pub fn ensure_working_day(mut date: NaiveDate) -> NaiveDate {
    while !is_working_day(date) {
        date = next_day(date);
    }
    date
}

/// Steps forward one calendar day at a time and counts only weekdays.
/// Adding zero days returns `date` unchanged, even on a weekend.
pub fn add_working_days(date: NaiveDate, days: u32) -> NaiveDate {
    let mut current = date;
    let mut added = 0;
    while added < days {
        current = next_day(current);
        if is_working_day(current) {
            added += 1;
        }
    }
    current
}

/// Number of weekdays between `from` and `to`, both inclusive.
pub fn count_working_days(from: NaiveDate, to: NaiveDate) -> u32 {
    if from > to {
        return 0;
    }
    from.iter_days()
        .take_while(|date| *date <= to)
        .filter(|date| is_working_day(*date))
        .count() as u32
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX)
}
