use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    config::EmailConfig,
    error::{AppError, Result},
    notify::EmailTransport,
};

pub struct SendGridTransport {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    from_address: String,
    from_name: String,
}

impl SendGridTransport {
    /// `None` unless email is enabled and an API key is configured.
    pub fn new(config: &EmailConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let api_key = config.sendgrid_api_key.clone().filter(|k| !k.trim().is_empty())?;

        Some(Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: format!("{}/v3/mail/send", config.api_base_url.trim_end_matches('/')),
            from_address: config.from_address.clone(),
            from_name: config.from_name.clone(),
        })
    }

    /// One personalization per recipient so nobody sees the rest of the list.
    fn payload(&self, recipients: &[String], subject: &str, html_body: &str) -> Value {
        let personalizations: Vec<Value> = recipients
            .iter()
            .map(|email| json!({ "to": [{ "email": email }] }))
            .collect();

        json!({
            "personalizations": personalizations,
            "from": {
                "email": self.from_address,
                "name": self.from_name,
            },
            "subject": subject,
            "content": [
                { "type": "text/html", "value": html_body }
            ]
        })
    }
}

#[async_trait]
impl EmailTransport for SendGridTransport {
    fn name(&self) -> &str {
        "SendGrid"
    }

    async fn send_batch(&self, recipients: &[String], subject: &str, html_body: &str) -> Result<()> {
        if recipients.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.payload(recipients, subject, html_body))
            .send()
            .await
            .map_err(|e| AppError::External(format!("SendGrid request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::External(format!("SendGrid error: {} - {}", status, body)))
    }
}
