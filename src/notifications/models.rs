use std::collections::HashMap;

/// Which outbound transport carries reminder emails, with its settings.
#[derive(Debug, Clone, PartialEq)]
pub enum SenderConfig {
    /// No transport configured. Every send fails, so nothing is recorded as sent.
    Unconfigured,
    /// Development transport: the email is written to the log and never leaves the process.
    Log,
    SendGrid { api_key: String, from: String },
    Webhook {
        url: String,
        method: String, // "POST" or "PUT"
        headers: Option<HashMap<String, String>>,
        body_template: Option<String>,
    },
}

impl SenderConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            SenderConfig::Unconfigured => "unconfigured",
            SenderConfig::Log => "log",
            SenderConfig::SendGrid { .. } => "sendgrid",
            SenderConfig::Webhook { .. } => "webhook",
        }
    }
}
