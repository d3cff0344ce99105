use async_trait::async_trait;
use tracing::warn;

use super::{NotificationSender, SenderError};

pub const NOT_CONFIGURED: &str = "Email service not configured";

/// Stands in when no email transport is set. Refuses every message so the
/// sweep reports a failure and the reminder stays due.
#[derive(Debug, Default)]
pub struct UnconfiguredSender;

#[async_trait]
impl NotificationSender for UnconfiguredSender {
    async fn send(&self, recipient: &str, subject: &str, _body: &str) -> Result<(), SenderError> {
        warn!(recipient, subject, "No email transport configured; reminder not sent.");
        Err(SenderError::InvalidConfiguration(NOT_CONFIGURED.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_sender_refuses() {
        let err = UnconfiguredSender
            .send("ops@example.com", "Rental Expiring", "<p>hi</p>")
            .await
            .unwrap_err();
        assert!(matches!(err, SenderError::InvalidConfiguration(ref msg) if msg == NOT_CONFIGURED));
    }
}
