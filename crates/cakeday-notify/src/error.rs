use thiserror::Error;

/// Errors that can occur while delivering a notification.
///
/// The notification cycle treats all of them alike: log, drop, move on to
/// the next employee. Transient and permanent failures are not told apart.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The transport accepted the connection but the message did not go out.
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// A recipient or sender string is not a valid mailbox.
    #[error("Invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// `deliver` was called with an empty recipient list.
    #[error("No recipients")]
    NoRecipients,

    /// The transport configuration is unusable (unknown host, bad TLS setup).
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
