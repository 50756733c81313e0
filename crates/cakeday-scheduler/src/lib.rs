//! `cakeday-scheduler`: the recurring birthday notification pipeline.
//!
//! # Overview
//!
//! [`SchedulerLoop`] wakes up at a fixed cadence and runs one
//! [`NotificationCycle`] for the window `[today, today + window_days]`:
//!
//! ```text
//! SchedulerLoop ── every cadence ──► NotificationCycle
//!                                      ├── EventStore::upcoming_recurring   (failure aborts the cycle)
//!                                      └── per employee
//!                                           ├── SubscriptionResolver::subscribers_of  (failure skips employee)
//!                                           ├── DeliveryLedger::notified              (optional dedupe)
//!                                           └── Notifier::deliver                     (failure skips employee)
//! ```
//!
//! Nothing escapes a cycle as an error; every failure ends in a log record
//! and a counter in [`CycleReport`].

pub mod cycle;
pub mod engine;
pub mod message;

pub use cycle::{CycleReport, ItemOutcome, NotificationCycle};
pub use engine::SchedulerLoop;
pub use message::Notice;
