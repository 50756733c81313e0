use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::notifier::{ensure_recipients, Notifier};

/// Writes notifications to the log instead of sending them.
///
/// Installed when `smtp.enabled = false`, which makes a fresh install usable
/// (and observable) before mail credentials exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, addresses: &[String], subject: &str, body: &str) -> Result<()> {
        ensure_recipients(addresses)?;
        info!(to = %addresses.join(", "), %subject, %body, "notification (smtp disabled)");
        Ok(())
    }
}
