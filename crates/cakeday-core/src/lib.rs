//! `cakeday-core`: configuration, domain types and recurrence math shared by
//! every other crate in the workspace.

pub mod config;
pub mod error;
pub mod recurrence;
pub mod types;

pub use config::CakedayConfig;
pub use error::{CakedayError, Result};
pub use types::{Employee, NotificationWindow, Subscriber, Subscription, User};
