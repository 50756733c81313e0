//! `cakeday-store`: SQLite persistence for employees, users and
//! subscriptions, plus the read capabilities the notification cycle consumes.
//!
//! | Capability              | SQLite implementation       |
//! |-------------------------|-----------------------------|
//! | [`EventStore`]          | [`EmployeeRepository`]      |
//! | [`SubscriptionResolver`]| [`SubscriptionRepository`]  |
//! | [`DeliveryLedger`]      | [`SqliteDeliveryLedger`]    |

pub mod capability;
pub mod db;
pub mod employees;
pub mod error;
pub mod ledger;
pub mod subscriptions;
pub mod users;

pub use capability::{DeliveryLedger, EventStore, SubscriptionResolver};
pub use db::Database;
pub use employees::EmployeeRepository;
pub use error::{Result, StoreError};
pub use ledger::SqliteDeliveryLedger;
pub use subscriptions::SubscriptionRepository;
pub use users::UserRepository;
