use std::time::Duration;

use async_trait::async_trait;
use cakeday_core::config::{SmtpConfig, TlsMode};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::error::{NotifyError, Result};
use crate::notifier::{ensure_recipients, Notifier};

/// Mails notifications through an SMTP relay.
///
/// One [`deliver`](Notifier::deliver) call produces one message whose `To:`
/// header lists every recipient.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Build the transport from config. No connection is opened until the
    /// first delivery, so an unreachable host shows up as failed deliveries.
    pub fn new(cfg: &SmtpConfig) -> Result<Self> {
        let from = parse_mailbox(cfg.sender())?;

        let builder = match cfg.tls {
            TlsMode::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
                .map_err(|e| NotifyError::ConfigError(format!("smtp host {}: {e}", cfg.host)))?,
            TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
                .map_err(|e| NotifyError::ConfigError(format!("smtp host {}: {e}", cfg.host)))?,
            TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.host),
        };

        let mut builder = builder
            .port(cfg.port)
            .timeout(Some(Duration::from_secs(cfg.timeout_secs)));
        if cfg.has_credentials() {
            builder = builder.credentials(Credentials::new(
                cfg.username.clone(),
                cfg.password.clone(),
            ));
        }

        info!(host = %cfg.host, port = cfg.port, tls = ?cfg.tls, "smtp notifier configured");
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn deliver(&self, addresses: &[String], subject: &str, body: &str) -> Result<()> {
        let message = build_message(&self.from, addresses, subject, body)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;
        debug!(code = %response.code(), recipients = addresses.len(), "smtp relay accepted message");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Assemble the plain-text message. Any malformed recipient fails the whole
/// message; the cycle logs it like any other delivery failure.
pub(crate) fn build_message(
    from: &Mailbox,
    addresses: &[String],
    subject: &str,
    body: &str,
) -> Result<Message> {
    ensure_recipients(addresses)?;

    let mut builder = Message::builder()
        .from(from.clone())
        .subject(subject)
        .header(ContentType::TEXT_PLAIN);
    for address in addresses {
        builder = builder.to(parse_mailbox(address)?);
    }
    builder
        .body(body.to_string())
        .map_err(|e| NotifyError::DeliveryFailed(format!("message build failed: {e}")))
}
