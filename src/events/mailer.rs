use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::AppError;
use crate::events::{MAILER_SEND_SUBJECT, Mail, Mailer, SendMailRequest, check_service_error};
use crate::middleware::current_request_id;

/// 通过 NATS request/reply 把邮件交给 mailer worker
#[derive(Clone)]
pub struct NatsMailer {
    client: async_nats::Client,
    timeout: Duration,
}

impl NatsMailer {
    pub fn new(client: async_nats::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Mailer for NatsMailer {
    async fn send(&self, mail: Mail) -> Result<(), AppError> {
        let request = SendMailRequest {
            request_id: current_request_id().unwrap_or_default(),
            receiver: mail.receiver,
            template_name: mail.template.name().to_string(),
            options: mail.options,
        };
        let payload = serde_json::to_vec(&request).map_err(AppError::internal)?;

        let reply = tokio::time::timeout(
            self.timeout,
            self.client.request(MAILER_SEND_SUBJECT, Bytes::from(payload)),
        )
        .await
        .map_err(|_| AppError::MailDispatchFailed("mailer request timed out".into()))?
        .map_err(|e| AppError::MailDispatchFailed(e.to_string()))?;

        check_service_error(reply.headers.as_ref())
            .map_err(|e| AppError::MailDispatchFailed(e.to_string()))?;

        tracing::debug!(template = %request.template_name, "mail dispatched");
        Ok(())
    }
}
