use std::time::Duration;

use cakeday_core::NotificationWindow;
use chrono::{Local, NaiveDate};
use tokio::sync::watch;
use tracing::info;

use crate::cycle::NotificationCycle;

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

/// Drives [`NotificationCycle`] forever at a fixed cadence.
///
/// Every iteration recomputes the window from the current date; nothing is
/// carried over between iterations. There is no backoff and no jitter: a
/// cycle that failed simply waits the same interval as one that succeeded.
pub struct SchedulerLoop {
    cycle: NotificationCycle,
    cadence: Duration,
    window_days: u32,
    today: Clock,
}

impl SchedulerLoop {
    pub fn new(cycle: NotificationCycle, cadence: Duration, window_days: u32) -> Self {
        Self {
            cycle,
            cadence,
            window_days,
            today: Box::new(|| Local::now().date_naive()),
        }
    }

    /// Replace the local-date clock (tests, or hosts pinned to another zone).
    pub fn with_clock(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Box::new(today);
        self
    }

    /// Main loop. Runs until `shutdown` broadcasts `true` or its sender is dropped.
    ///
    /// Shutdown is only observed between cycles: a cycle in progress always
    /// finishes, so no message is cut off mid-send, and no new cycle starts
    /// once shutdown has been seen.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            cadence_secs = self.cadence.as_secs(),
            window_days = self.window_days,
            "scheduler loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let window = NotificationWindow::new((self.today)(), self.window_days);
            self.cycle.run(window).await;

            if !wait_or_shutdown(self.cadence, &mut shutdown).await {
                break;
            }
        }

        info!("scheduler loop shutting down");
    }
}

/// Sleep for `cadence`. Returns false as soon as shutdown is requested.
async fn wait_or_shutdown(cadence: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let sleep = tokio::time::sleep(cadence);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return false;
                }
            }
        }
    }
}
