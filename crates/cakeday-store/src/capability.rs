use std::collections::HashSet;

use async_trait::async_trait;
use cakeday_core::{Employee, NotificationWindow, Subscriber};

use crate::error::Result;

/// Read access to employees whose birthday comes back every year.
///
/// Implementations must be `Send + Sync` so the scheduler task can hold them
/// behind an `Arc` while request-side code keeps using the same store.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Every employee whose next birthday, on or after `window.start`, lands
    /// no later than `window.end()`. The stored year plays no part, and a
    /// December window sees January birthdays of the following year.
    async fn upcoming_recurring(&self, window: NotificationWindow) -> Result<Vec<Employee>>;
}

/// Maps an employee to the users subscribed to them.
#[async_trait]
pub trait SubscriptionResolver: Send + Sync {
    /// Current subscribers of `employee_id`. An empty list is a valid answer.
    async fn subscribers_of(&self, employee_id: i64) -> Result<Vec<Subscriber>>;
}

/// Remembers who has already been told about which year's birthday.
#[async_trait]
pub trait DeliveryLedger: Send + Sync {
    /// User ids already notified about `employee_id`'s birthday in `occurrence_year`.
    async fn notified(&self, employee_id: i64, occurrence_year: i32) -> Result<HashSet<i64>>;

    /// Mark `user_ids` as notified. Recording the same pair twice is a no-op.
    async fn record(&self, employee_id: i64, occurrence_year: i32, user_ids: &[i64]) -> Result<()>;
}
