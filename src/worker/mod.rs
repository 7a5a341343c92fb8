// 邮件 worker：订阅消息总线上的发送请求，渲染模板并交给邮件服务商
pub mod mailgun;
pub mod template;

use std::future::Future;
use std::sync::Arc;

use async_nats::Subject;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tracing::Instrument;

use crate::events::{
    MAILER_PING_SUBJECT, MAILER_QUEUE_GROUP, MAILER_SEND_SUBJECT, MailTemplate, SendMailRequest,
    service_error_headers,
};

pub use mailgun::MailgunProvider;
pub use template::{RenderedMail, TemplateRenderer};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("missing receiver")]
    MissingReceiver,
    #[error("unknown template: {0}")]
    UnknownTemplate(String),
    #[error("missing option: {0}")]
    MissingOption(&'static str),
    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl WorkerError {
    /// 回复头里的错误码
    pub fn code(&self) -> u16 {
        match self {
            WorkerError::Delivery(_) => 500,
            _ => 400,
        }
    }
}

/// 邮件服务商
#[async_trait]
pub trait MailProvider: Send + Sync {
    async fn deliver(&self, to: &str, subject: &str, html: &str) -> Result<(), WorkerError>;
}

pub struct MailService {
    provider: Arc<dyn MailProvider>,
    renderer: TemplateRenderer,
}

impl MailService {
    pub fn new(provider: Arc<dyn MailProvider>, renderer: TemplateRenderer) -> Self {
        Self { provider, renderer }
    }

    pub async fn handle_payload(&self, payload: &[u8]) -> Result<(), WorkerError> {
        let request: SendMailRequest = serde_json::from_slice(payload)
            .map_err(|e| WorkerError::InvalidPayload(e.to_string()))?;

        let span = tracing::info_span!(
            "mail",
            request_id = %request.request_id,
            template = %request.template_name,
        );
        self.send(&request).instrument(span).await
    }

    pub async fn send(&self, request: &SendMailRequest) -> Result<(), WorkerError> {
        let receiver = request.receiver.trim();
        if receiver.is_empty() {
            return Err(WorkerError::MissingReceiver);
        }

        let template = MailTemplate::from_name(&request.template_name)
            .ok_or_else(|| WorkerError::UnknownTemplate(request.template_name.clone()))?;
        let mail = self.renderer.render(template, &request.options)?;

        self.provider
            .deliver(receiver, &mail.subject, &mail.html)
            .await?;

        tracing::info!(to = %receiver, "email sent");
        Ok(())
    }
}

/// 以队列组订阅，多个 worker 实例分摊请求
pub struct MailerWorker {
    client: async_nats::Client,
    service: Arc<MailService>,
}

impl MailerWorker {
    pub fn new(client: async_nats::Client, service: MailService) -> Self {
        Self {
            client,
            service: Arc::new(service),
        }
    }

    pub async fn run(
        self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), async_nats::SubscribeError> {
        let mut send = self
            .client
            .queue_subscribe(MAILER_SEND_SUBJECT, MAILER_QUEUE_GROUP.to_string())
            .await?;
        let mut ping = self
            .client
            .queue_subscribe(MAILER_PING_SUBJECT, MAILER_QUEUE_GROUP.to_string())
            .await?;
        tracing::info!(subject = MAILER_SEND_SUBJECT, "mailer is listening");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                message = send.next() => {
                    let Some(message) = message else { break };
                    let client = self.client.clone();
                    let service = self.service.clone();
                    tokio::spawn(async move {
                        let result = service.handle_payload(&message.payload).await;
                        if let Err(e) = &result {
                            tracing::error!(error = %e, "failed to send email");
                        }
                        reply(&client, message.reply, result).await;
                    });
                }
                message = ping.next() => {
                    let Some(message) = message else { break };
                    if let Some(subject) = message.reply {
                        let pong = Bytes::from_static(br#"{"message":"pong"}"#);
                        if let Err(e) = self.client.publish(subject, pong).await {
                            tracing::warn!(error = %e, "failed to answer ping");
                        }
                    }
                }
                _ = &mut shutdown => break,
            }
        }

        tracing::info!("stopping the mailer");
        if let Err(e) = send.unsubscribe().await {
            tracing::warn!(error = %e, "failed to unsubscribe");
        }
        if let Err(e) = ping.unsubscribe().await {
            tracing::warn!(error = %e, "failed to unsubscribe");
        }
        if let Err(e) = self.client.flush().await {
            tracing::warn!(error = %e, "failed to flush NATS connection");
        }
        Ok(())
    }
}

/// 成功回复空消息体，失败通过错误头返回
async fn reply(client: &async_nats::Client, subject: Option<Subject>, result: Result<(), WorkerError>) {
    let Some(subject) = subject else {
        tracing::warn!("send request without reply subject");
        return;
    };

    let published = match result {
        Ok(()) => client.publish(subject, Bytes::new()).await,
        Err(e) => {
            let headers = service_error_headers(e.code(), &e.to_string());
            client
                .publish_with_headers(subject, headers, Bytes::new())
                .await
        }
    };
    if let Err(e) = published {
        tracing::error!(error = %e, "failed to publish reply");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::events::check_service_error;

    #[derive(Default)]
    struct RecordingProvider {
        sent: Mutex<Vec<(String, String, String)>>,
        failing: AtomicBool,
    }

    #[async_trait]
    impl MailProvider for RecordingProvider {
        async fn deliver(&self, to: &str, subject: &str, html: &str) -> Result<(), WorkerError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(WorkerError::Delivery("provider unavailable".into()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((to.into(), subject.into(), html.into()));
            Ok(())
        }
    }

    fn service() -> (MailService, Arc<RecordingProvider>) {
        let provider = Arc::new(RecordingProvider::default());
        let service = MailService::new(
            provider.clone(),
            TemplateRenderer::new("https://api.example", "https://app.example"),
        );
        (service, provider)
    }

    fn payload(template: &str, token: &str) -> Vec<u8> {
        serde_json::to_vec(&SendMailRequest {
            request_id: "req-1".into(),
            receiver: "a@b.c".into(),
            template_name: template.into(),
            options: HashMap::from([("token".to_string(), token.to_string())]),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn renders_and_delivers() {
        let (service, provider) = service();
        service
            .handle_payload(&payload("email_verification", "T"))
            .await
            .unwrap();

        let sent = provider.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "a@b.c");
        assert!(sent[0].2.contains("/api/v1/auth/verify/T"));
    }

    #[tokio::test]
    async fn rejects_bad_requests_with_client_code() {
        let (service, provider) = service();

        let err = service.handle_payload(b"not json").await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidPayload(_)));
        assert_eq!(err.code(), 400);

        let err = service
            .handle_payload(&payload("newsletter", "T"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::UnknownTemplate(_)));
        assert_eq!(err.code(), 400);

        assert!(provider.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_maps_to_server_error() {
        let (service, provider) = service();
        provider.failing.store(true, Ordering::SeqCst);

        let err = service
            .handle_payload(&payload("reset_password", "T"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), 500);

        let headers = service_error_headers(err.code(), &err.to_string());
        let reply = check_service_error(Some(&headers)).unwrap_err();
        assert_eq!(reply.code, "500");
    }
}
