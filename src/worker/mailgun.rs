use std::time::Duration;

use async_trait::async_trait;

use crate::config::MailerConfig;

use super::{MailProvider, WorkerError};

/// Mailgun HTTP API
pub struct MailgunProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl MailgunProvider {
    pub fn new(config: &MailerConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.send_timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/{}/messages",
                config.mailgun_base_url.trim_end_matches('/'),
                config.mailgun_domain
            ),
            api_key: config.mailgun_api_key.clone(),
            from: config.mailgun_from.clone(),
        })
    }
}

#[async_trait]
impl MailProvider for MailgunProvider {
    async fn deliver(&self, to: &str, subject: &str, html: &str) -> Result<(), WorkerError> {
        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth("api", Some(&self.api_key))
            .form(&[
                ("from", self.from.as_str()),
                ("to", to),
                ("subject", subject),
                ("html", html),
            ])
            .send()
            .await
            .map_err(|e| WorkerError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkerError::Delivery(format!("mailgun returned {status}: {body}")));
        }
        Ok(())
    }
}
