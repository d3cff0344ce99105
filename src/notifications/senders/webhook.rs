use async_trait::async_trait;
use reqwest::{header, Client, Method};
use std::collections::HashMap;
use tera::{Context, Tera};

use super::{NotificationSender, SenderError};

/// Used when no body template is configured. Values go through `json_encode`
/// so HTML bodies and quotes stay valid JSON.
pub const DEFAULT_BODY_TEMPLATE: &str = r#"{"to": {{ recipient | json_encode() | safe }}, "subject": {{ subject | json_encode() | safe }}, "html": {{ body | json_encode() | safe }}}"#;

/// Hands notifications to a mail relay over HTTP.
pub struct WebhookSender {
    client: Client,
    url: String,
    method: Method,
    headers: header::HeaderMap,
    body_template: String,
}

impl WebhookSender {
    pub fn new(
        url: String,
        method: &str,
        headers: HashMap<String, String>,
        body_template: Option<String>,
    ) -> Result<Self, SenderError> {
        let method = match method.to_uppercase().as_str() {
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            _ => {
                return Err(SenderError::InvalidConfiguration(format!(
                    "Unsupported HTTP method: {method}"
                )));
            }
        };

        let mut header_map = header::HeaderMap::new();
        for (key, value) in &headers {
            let header_name = header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| SenderError::InvalidConfiguration(format!("Invalid header name: {e}")))?;
            let header_value = header::HeaderValue::from_str(value)
                .map_err(|e| SenderError::InvalidConfiguration(format!("Invalid header value: {e}")))?;
            header_map.insert(header_name, header_value);
        }

        Ok(Self {
            client: Client::new(),
            url,
            method,
            headers: header_map,
            body_template: body_template.unwrap_or_else(|| DEFAULT_BODY_TEMPLATE.to_string()),
        })
    }
}

/// Renders the request body. Autoescape is off: templates produce JSON, not HTML.
pub fn render_body(
    template: &str,
    recipient: &str,
    subject: &str,
    body: &str,
) -> Result<String, SenderError> {
    let mut context = Context::new();
    context.insert("recipient", recipient);
    context.insert("subject", subject);
    context.insert("body", body);

    Tera::one_off(template, &context, false).map_err(|e| SenderError::TemplatingError(e.to_string()))
}

#[async_trait]
impl NotificationSender for WebhookSender {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SenderError> {
        let rendered_body = render_body(&self.body_template, recipient, subject, body)?;

        let response = self
            .client
            .request(self.method.clone(), &self.url)
            .headers(self.headers.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(rendered_body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Webhook returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}
