//! Yearly recurrence of a stored date.
//!
//! Only the month and day of a stored date matter. The recurrence is placed
//! on the reference year, or on the following year when this year's date is
//! already behind us, so a window that straddles New Year still sees
//! early-January dates. A 29 February date recurs on 28 February in common
//! years.

use chrono::{Datelike, NaiveDate};

/// Place `date`'s month/day in `year`.
pub fn anchor(date: NaiveDate, year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        // only Feb 29 can fail, and Feb 28 always exists
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), date.day() - 1))
        .unwrap_or(date)
}

/// The first recurrence of `date` on or after `from`.
pub fn next_occurrence(date: NaiveDate, from: NaiveDate) -> NaiveDate {
    let this_year = anchor(date, from.year());
    if this_year >= from {
        this_year
    } else {
        anchor(date, from.year() + 1)
    }
}

/// Whole days from `from` until the next recurrence of `date` (0 = today).
pub fn days_until(date: NaiveDate, from: NaiveDate) -> u32 {
    let days = (next_occurrence(date, from) - from).num_days();
    // next_occurrence never precedes `from`, and a year is at most 366 days
    u32::try_from(days).unwrap_or(u32::MAX)
}
