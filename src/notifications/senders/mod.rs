use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::models::SenderConfig;

pub mod log;
pub mod sendgrid;
pub mod unconfigured;
pub mod webhook;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Invalid configuration for sender: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Templating error: {0}")]
    TemplatingError(String),
    #[error("Notification dispatch timed out after {0:?}")]
    Timeout(Duration),
}

/// Delivers one email-shaped notification to a human operator.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Sends `subject` and the HTML `body` to `recipient`.
    /// `Ok` means the transport accepted the message.
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SenderError>;
}

/// Builds the sender described by `config`.
pub fn build_sender(config: &SenderConfig) -> Result<Arc<dyn NotificationSender>, SenderError> {
    let sender: Arc<dyn NotificationSender> = match config {
        SenderConfig::Unconfigured => Arc::new(unconfigured::UnconfiguredSender),
        SenderConfig::Log => Arc::new(log::LogSender::new()),
        SenderConfig::SendGrid { api_key, from } => {
            Arc::new(sendgrid::SendGridSender::new(api_key.clone(), from.clone())?)
        }
        SenderConfig::Webhook {
            url,
            method,
            headers,
            body_template,
        } => Arc::new(webhook::WebhookSender::new(
            url.clone(),
            method,
            headers.clone().unwrap_or_default(),
            body_template.clone(),
        )?),
    };
    Ok(sender)
}
