pub mod error;
pub mod log_notifier;
pub mod notifier;
pub mod smtp;

pub use error::NotifyError;
pub use log_notifier::LogNotifier;
pub use notifier::Notifier;
pub use smtp::SmtpNotifier;

use std::sync::Arc;

use cakeday_core::config::SmtpConfig;

/// Pick the transport for this config: SMTP when enabled, log-only otherwise.
pub fn from_config(cfg: &SmtpConfig) -> error::Result<Arc<dyn Notifier>> {
    if cfg.enabled {
        Ok(Arc::new(SmtpNotifier::new(cfg)?))
    } else {
        Ok(Arc::new(LogNotifier))
    }
}
