//! Mail delivery for `*mail_async`

use apolo_core::config::MailerConfig;
use apolo_core::{AppError, AppResult};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Delivery attempts before a mail is dropped
pub const MAIL_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, from: &str, message: &MailMessage) -> AppResult<()>;
}

/// SMTP delivery through lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &MailerConfig) -> Self {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.host()).port(config.port());
        if !config.auth_user.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.auth_user.clone(),
                config.auth_password.clone(),
            ));
        }
        Self {
            transport: builder.build(),
        }
    }
}

fn mailbox(address: &str) -> AppResult<Mailbox> {
    address
        .parse()
        .map_err(|e| AppError::Mail(format!("invalid address {}: {}", address, e)))
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, from: &str, message: &MailMessage) -> AppResult<()> {
        let mut builder = Message::builder()
            .from(mailbox(from)?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN);
        for to in &message.to {
            builder = builder.to(mailbox(to)?);
        }
        let email = builder
            .body(message.body.clone())
            .map_err(|e| AppError::Mail(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;
        Ok(())
    }
}

/// Deliver `message` in the background.
///
/// Retries up to [`MAIL_ATTEMPTS`] times, sleeping `attempt * retry_interval`
/// after each failure. The final failure is logged and dropped.
pub fn spawn_mail_with_retry(
    sender: Arc<dyn MailSender>,
    from: String,
    message: MailMessage,
    retry_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        for attempt in 0..MAIL_ATTEMPTS {
            match sender.send(&from, &message).await {
                Ok(()) => {
                    info!(recipients = ?message.to, subject = %message.subject, "Mail sent");
                    return;
                }
                Err(e) if attempt + 1 == MAIL_ATTEMPTS => {
                    warn!(
                        recipients = ?message.to,
                        attempts = MAIL_ATTEMPTS,
                        error = %e,
                        "Giving up on mail delivery"
                    );
                    return;
                }
                Err(e) => {
                    debug!(attempt, error = %e, "Mail delivery failed, retrying");
                }
            }
            tokio::time::sleep(retry_interval * attempt).await;
        }
    })
}
