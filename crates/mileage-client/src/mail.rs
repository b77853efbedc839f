//! SMTP delivery of the run summary.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use mileage_core::config::SmtpConfig;
use mileage_core::error::AppError;
use mileage_core::traits::Notifier;
use tracing::{debug, info};

/// Notifier sending HTML mail through a STARTTLS relay.
///
/// Built from an optional [`SmtpConfig`]: without one, mail is disabled and
/// every [`notify`](Notifier::notify) call returns `Ok(())` without sending.
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    config: Option<SmtpConfig>,
}

impl SmtpNotifier {
    /// SMTP command timeout.
    const TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(config: Option<SmtpConfig>) -> Self {
        Self { config }
    }

    pub fn disabled() -> Self {
        Self { config: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Builds the HTML message for all configured recipients.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotificationError` if the configuration is
    /// incomplete or an address cannot be parsed.
    pub fn build_message(
        config: &SmtpConfig,
        subject: &str,
        html_body: &str,
    ) -> Result<Message, AppError> {
        config.validate()?;

        let from = config.from.as_deref().unwrap_or_default();
        let mut builder = Message::builder()
            .from(parse_mailbox(from)?)
            .subject(subject)
            .header(ContentType::TEXT_HTML);
        for to in &config.to {
            builder = builder.to(parse_mailbox(to)?);
        }

        builder
            .body(html_body.to_string())
            .map_err(|e| AppError::NotificationError(format!("Cannot build message: {}", e)))
    }

    fn transport(config: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, AppError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::NotificationError(format!("SMTP relay {}: {}", config.host, e)))?
            .port(config.port)
            .timeout(Some(Self::TIMEOUT));

        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(builder.build())
    }
}

impl Notifier for SmtpNotifier {
    async fn notify(&self, subject: &str, html_body: &str) -> Result<(), AppError> {
        let Some(config) = &self.config else {
            debug!("Mail disabled, summary not sent");
            return Ok(());
        };

        let message = Self::build_message(config, subject, html_body)?;
        let mailer = Self::transport(config)?;

        mailer
            .send(message)
            .await
            .map_err(|e| AppError::NotificationError(e.to_string()))?;

        info!(recipients = config.to.len(), subject, "Summary mail sent");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, AppError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| AppError::NotificationError(format!("Invalid address '{}': {}", address, e)))
}

/// Notifier that drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    async fn notify(&self, _subject: &str, _html_body: &str) -> Result<(), AppError> {
        Ok(())
    }
}
