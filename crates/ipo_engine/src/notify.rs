use std::time::Duration;

use ipo_core::{compose_notification, DeliveryReport, EmailMessage, IpoRecord, RecipientFailure};
use ipo_logging::{ipo_debug, ipo_info, ipo_warn};

use crate::mail::{MailError, MailTransport};

#[derive(Debug, Clone)]
pub struct NotifierSettings {
    pub recipients: Vec<String>,
    /// Attempts per recipient for temporary failures.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub dry_run: bool,
}

impl NotifierSettings {
    pub fn new(recipients: Vec<String>) -> Self {
        Self {
            recipients,
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// The transport refused our credentials; the partial report covers the
    /// recipients reached before that.
    #[error("mail authentication failed: {message}")]
    Auth {
        message: String,
        report: DeliveryReport,
    },
}

/// Sends one listing to every configured recipient.
pub struct Notifier {
    transport: Box<dyn MailTransport>,
    settings: NotifierSettings,
}

impl Notifier {
    pub fn new(transport: Box<dyn MailTransport>, settings: NotifierSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn recipients(&self) -> &[String] {
        &self.settings.recipients
    }

    pub fn is_dry_run(&self) -> bool {
        self.settings.dry_run
    }

    pub fn transport(&self) -> &dyn MailTransport {
        self.transport.as_ref()
    }

    /// Composes the notification and reports it as delivered without
    /// touching the transport.
    pub fn simulate(&self, record: &IpoRecord) -> DeliveryReport {
        let message = compose_notification(record);
        ipo_info!(
            "[dry-run] Would send {:?} to {} recipient(s)",
            message.subject,
            self.settings.recipients.len()
        );
        ipo_debug!("[dry-run] Body:\n{}", message.body);
        DeliveryReport::simulated(&self.settings.recipients)
    }

    /// Delivers to each recipient in turn. Rejected recipients land in the
    /// report; an authentication failure stops the fan-out.
    pub async fn notify(&self, record: &IpoRecord) -> Result<DeliveryReport, NotifyError> {
        if self.settings.dry_run {
            return Ok(self.simulate(record));
        }
        let message = compose_notification(record);
        let mut report = DeliveryReport::default();
        for recipient in &self.settings.recipients {
            match self.send_with_retry(recipient, &message).await {
                Ok(()) => {
                    ipo_info!("Sent {} to {}", record.id(), recipient);
                    report.delivered.push(recipient.clone());
                }
                Err(err) if err.is_fatal() => {
                    return Err(NotifyError::Auth {
                        message: err.to_string(),
                        report,
                    });
                }
                Err(err) => {
                    ipo_warn!("Could not send {} to {}: {}", record.id(), recipient, err);
                    report.failed.push(RecipientFailure {
                        recipient: recipient.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    async fn send_with_retry(
        &self,
        recipient: &str,
        message: &EmailMessage,
    ) -> Result<(), MailError> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut backoff = self.settings.initial_backoff;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.send(recipient, message).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    ipo_debug!(
                        "Send attempt {}/{} to {} failed: {}; retrying in {:?}",
                        attempt,
                        max_attempts,
                        recipient,
                        err,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(err) => return Err(err),
            }
        }
    }
}
