use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{NotificationSender, SenderError};

const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Delivers email through the SendGrid v3 HTTP API.
pub struct SendGridSender {
    client: Client,
    api_key: String,
    from: String,
}

impl SendGridSender {
    pub fn new(api_key: String, from: String) -> Result<Self, SenderError> {
        if api_key.trim().is_empty() {
            return Err(SenderError::InvalidConfiguration(
                "SendGrid API key is empty.".to_string(),
            ));
        }
        if !from.contains('@') {
            return Err(SenderError::InvalidConfiguration(format!(
                "SendGrid sender address is not an email address: {from}"
            )));
        }
        Ok(Self {
            client: Client::new(),
            api_key,
            from,
        })
    }
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct MailSend<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

fn mail_payload<'a>(from: &'a str, recipient: &'a str, subject: &'a str, body: &'a str) -> MailSend<'a> {
    MailSend {
        personalizations: [Personalization {
            to: [Address { email: recipient }],
        }],
        from: Address { email: from },
        subject,
        content: [Content {
            content_type: "text/html",
            value: body,
        }],
    }
}

#[async_trait]
impl NotificationSender for SendGridSender {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SenderError> {
        let payload = mail_payload(&self.from, recipient, subject, body);

        let response = self
            .client
            .post(SENDGRID_API_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "SendGrid API returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}
