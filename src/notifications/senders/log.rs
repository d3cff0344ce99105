use async_trait::async_trait;
use tracing::info;

use super::{NotificationSender, SenderError};

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct LogSender;

impl LogSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSender for LogSender {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SenderError> {
        info!(
            recipient,
            subject,
            body_len = body.len(),
            "Email transport is log-only; notification not delivered."
        );
        Ok(())
    }
}
