//! Order confirmation email.
//!
//! Sends through SMTP via lettre when a relay is configured. Without one the
//! composed email is written to the log instead, so the email flow still
//! completes in local development.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// How an email left the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Logged,
}

/// Transactional email sender.
#[derive(Clone)]
pub struct EmailService {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
}

impl EmailService {
    /// Create an email service. `None` logs emails instead of sending them.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay address is invalid.
    pub fn new(config: Option<&EmailConfig>) -> Result<Self, SmtpError> {
        let Some(config) = config else {
            return Ok(Self::log_only());
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            mailer: Some(builder.build()),
            from_address: config.from.clone(),
        })
    }

    /// An email service that only logs.
    #[must_use]
    pub fn log_only() -> Self {
        Self {
            mailer: None,
            from_address: "CaseCraft <orders@casecraft.local>".to_owned(),
        }
    }

    /// Send a plain-text email.
    ///
    /// # Errors
    ///
    /// Returns error if an address is malformed or the relay rejects the email.
    #[tracing::instrument(skip(self, body), fields(subject = %subject))]
    pub async fn send_text(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<Delivery, EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        let Some(mailer) = &self.mailer else {
            tracing::info!(to = %to, body = %body, "SMTP not configured, email logged");
            return Ok(Delivery::Logged);
        };

        mailer.send(email).await?;
        tracing::info!(to = %to, "Email sent successfully");
        Ok(Delivery::Sent)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_only_delivery() {
        let service = EmailService::new(None).unwrap();
        let delivery = service
            .send_text("dev@example.com", "Order Confirmation", "Hello")
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Logged);
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let result = EmailService::log_only()
            .send_text("not an address", "Order Confirmation", "Hello")
            .await;
        assert!(matches!(result, Err(EmailError::InvalidAddress(_))));
    }
}
