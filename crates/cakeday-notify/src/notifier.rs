use async_trait::async_trait;

use crate::error::Result;

/// Common interface implemented by every delivery transport.
///
/// Implementations must be `Send + Sync` so they can be shared with the
/// scheduler task behind an `Arc`.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Stable lowercase identifier used in logs (e.g. `"smtp"`).
    fn name(&self) -> &str;

    /// Send one message addressed to every entry of `addresses` at once.
    ///
    /// Fan-out already happened when subscribers were resolved; transports
    /// must not split the list into one message per recipient. An empty
    /// list is rejected with [`NotifyError::NoRecipients`](crate::NotifyError::NoRecipients).
    async fn deliver(&self, addresses: &[String], subject: &str, body: &str) -> Result<()>;
}

/// Reject an empty recipient list before any transport work happens.
pub(crate) fn ensure_recipients(addresses: &[String]) -> Result<()> {
    if addresses.is_empty() {
        return Err(crate::NotifyError::NoRecipients);
    }
    Ok(())
}
