use cakeday_core::{recurrence, Employee};
use chrono::NaiveDate;

/// Subject and body of one birthday announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub subject: String,
    pub body: String,
}

impl Notice {
    /// Deterministic text for `employee`, as seen from `today`.
    ///
    /// The date is rendered as day and month only; the stored year is a
    /// birth year and printing it would be wrong.
    pub fn compose(employee: &Employee, today: NaiveDate) -> Self {
        let when = match recurrence::days_until(employee.birthday, today) {
            0 => "today".to_string(),
            1 => "tomorrow".to_string(),
            n => format!("in {n} days"),
        };
        Self {
            subject: format!("It's {}'s birthday soon!", employee.name),
            body: format!(
                "Don't forget to congratulate {} on {} ({when})!",
                employee.name,
                employee.birthday_label()
            ),
        }
    }
}
