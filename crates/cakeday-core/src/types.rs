use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CakedayError, Result};
use crate::recurrence;

/// Input format accepted for birthdays on the admin side, e.g. `29.12.1990`.
pub const BIRTHDAY_INPUT_FORMAT: &str = "%d.%m.%Y";

/// An employee whose birthday recurs every year. Only month and day matter
/// for matching; the stored year is kept for display in admin listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub birthday: NaiveDate,
}

impl Employee {
    /// Day and month in words, never the year: `"29 December"`.
    pub fn birthday_label(&self) -> String {
        self.birthday.format("%d %B").to_string()
    }
}

/// A registered user who can subscribe to employees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    /// RFC-3339 creation timestamp.
    pub created_at: String,
}

/// Link between one user and one employee; unique per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub employee_id: i64,
}

/// What the notification cycle needs to know about a subscribed user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscriber {
    pub user_id: i64,
    pub email: String,
}

/// `[start, start + days]`, inclusive on both ends. Built fresh for every
/// cycle and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationWindow {
    pub start: NaiveDate,
    pub days: u32,
}

impl NotificationWindow {
    pub fn new(start: NaiveDate, days: u32) -> Self {
        Self { start, days }
    }

    /// Window starting at the host's current local date.
    pub fn starting_today(days: u32) -> Self {
        Self::new(Local::now().date_naive(), days)
    }

    /// Last day still inside the window. Saturates at the calendar's end.
    pub fn end(&self) -> NaiveDate {
        self.start
            .checked_add_signed(Duration::days(i64::from(self.days)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// True when the next recurrence of `birthday` falls inside the window.
    pub fn contains(&self, birthday: NaiveDate) -> bool {
        recurrence::days_until(birthday, self.start) <= self.days
    }
}

impl fmt::Display for NotificationWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end())
    }
}

/// Parse a birthday typed by an operator (`DD.MM.YYYY`).
pub fn parse_birthday(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), BIRTHDAY_INPUT_FORMAT)
        .map_err(|e| CakedayError::InvalidDate(format!("{input:?}: {e} (expected DD.MM.YYYY)")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_end_is_inclusive() {
        let w = NotificationWindow::new(date(2024, 12, 26), 7);
        assert_eq!(w.end(), date(2025, 1, 2));
        assert_eq!(w.to_string(), "2024-12-26..=2025-01-02");
    }

    #[test]
    fn late_december_birthday_across_window_starts() {
        let born = date(1988, 12, 30);
        assert!(NotificationWindow::new(date(2024, 12, 26), 7).contains(born));
        // exactly seven days out is still inside
        assert!(NotificationWindow::new(date(2024, 12, 23), 7).contains(born));
        assert!(!NotificationWindow::new(date(2024, 12, 22), 7).contains(born));
        // already passed this year, next one is far away
        assert!(!NotificationWindow::new(date(2024, 12, 31), 7).contains(born));
    }

    #[test]
    fn early_january_birthday_seen_from_december() {
        let born = date(1979, 1, 2);
        assert!(NotificationWindow::new(date(2024, 12, 26), 7).contains(born));
        assert!(!NotificationWindow::new(date(2024, 12, 20), 7).contains(born));
    }

    #[test]
    fn oversized_window_saturates_instead_of_overflowing() {
        let w = NotificationWindow::new(date(2024, 12, 26), u32::MAX);
        assert_eq!(w.end(), NaiveDate::MAX);
        assert!(w.to_string().starts_with("2024-12-26..="));
        assert!(w.contains(date(1990, 12, 25)));
    }

    #[test]
    fn zero_day_window_only_matches_today() {
        let w = NotificationWindow::new(date(2024, 5, 10), 0);
        assert!(w.contains(date(1990, 5, 10)));
        assert!(!w.contains(date(1990, 5, 11)));
    }

    #[test]
    fn birthday_label_has_no_year() {
        let e = Employee {
            id: 1,
            name: "Alex".to_string(),
            birthday: date(1990, 3, 5),
        };
        assert_eq!(e.birthday_label(), "05 March");
    }

    #[test]
    fn parses_operator_birthday_format() {
        assert_eq!(parse_birthday("29.12.1990").unwrap(), date(1990, 12, 29));
        assert_eq!(parse_birthday(" 01.02.2000 ").unwrap(), date(2000, 2, 1));
    }

    #[test]
    fn rejects_iso_and_garbage() {
        assert!(matches!(
            parse_birthday("1990-12-29"),
            Err(CakedayError::InvalidDate(_))
        ));
        assert!(parse_birthday("31.02.1990").is_err());
        assert!(parse_birthday("").is_err());
    }
}
