//! Outbound email notifications.
//!
//! Notifications are best effort: they run on a detached task and a failure
//! is logged, never returned to the request that triggered it.

use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use tokio::task::JoinHandle;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

/// Delivery channel for user notifications
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, to: &str, subject: &str, body: &str) -> AppResult<()>;
}

/// SMTP delivery through lettre
pub struct SmtpNotifier {
    config: EmailConfig,
}

impl SmtpNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, to: &str, subject: &str, body: &str) -> AppResult<Message> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("Library");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                "<html><body><p>{}</p></body></html>",
                                body.replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }

    fn transport(&self) -> AppResult<SmtpTransport> {
        let builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let builder = match (&self.config.smtp_username, &self.config.smtp_password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        Ok(builder.build())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let message = self.build_message(to, subject, body)?;
        let mailer = self.transport()?;

        // lettre's SMTP transport is blocking
        tokio::task::spawn_blocking(move || mailer.send(&message))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

/// Used when `email.enabled` is false
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, to: &str, subject: &str, _body: &str) -> AppResult<()> {
        tracing::debug!(to, subject, "Email disabled, notification dropped");
        Ok(())
    }
}

#[derive(Clone)]
pub struct EmailService {
    notifier: Arc<dyn Notifier>,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        let notifier: Arc<dyn Notifier> = if config.enabled {
            Arc::new(SmtpNotifier::new(config))
        } else {
            Arc::new(DisabledNotifier)
        };
        Self { notifier }
    }

    pub fn with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Send on a detached task; failures are only logged
    pub fn send_in_background(&self, to: String, subject: String, body: String) -> JoinHandle<()> {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&to, &subject, &body).await {
                tracing::warn!("Failed to notify {}: {}", to, e);
            }
        })
    }

    /// Tell both the old and the new address about an email change
    pub fn email_changed(&self, old: &str, new: &str) -> Vec<JoinHandle<()>> {
        let subject = "Your library account email was changed".to_string();
        let body = format!(
            "The email address of your library account was changed from {} to {}.\n\n\
             If you did not request this change, please contact the library.",
            old, new
        );
        vec![
            self.send_in_background(old.to_string(), subject.clone(), body.clone()),
            self.send_in_background(new.to_string(), subject, body),
        ]
    }

    pub fn biography_changed(&self, to: &str) -> JoinHandle<()> {
        self.send_in_background(
            to.to_string(),
            "Your library profile was updated".to_string(),
            "The biography on your library profile was updated.".to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_email_changed_notifies_both_addresses() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|to, _, _| to.to_string() == "old@example.pt")
            .times(1)
            .returning(|_, _, _| Ok(()));
        notifier
            .expect_notify()
            .withf(|to, _, _| to.to_string() == "new@example.pt")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = EmailService::with_notifier(Arc::new(notifier));
        for handle in service.email_changed("old@example.pt", "new@example.pt") {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|to, _, _| to.to_string() == "reader@example.pt")
            .times(1)
            .returning(|_, _, _| Err(AppError::Internal("smtp down".to_string())));

        let service = EmailService::with_notifier(Arc::new(notifier));
        // The task completes normally even though delivery failed
        service.biography_changed("reader@example.pt").await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_notifier_accepts_everything() {
        let service = EmailService::new(EmailConfig::default());
        service
            .send_in_background("a@example.pt".into(), "s".into(), "b".into())
            .await
            .unwrap();
    }
}
