// 消息总线上的邮件 RPC：请求结构、模板名、错误头
pub mod mailer;

use std::collections::HashMap;
use std::fmt;

use async_nats::HeaderMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub use mailer::NatsMailer;

pub const MAILER_SEND_SUBJECT: &str = "mailer.send";
pub const MAILER_PING_SUBJECT: &str = "mailer.ping";
pub const MAILER_QUEUE_GROUP: &str = "mailer";

pub const SERVICE_ERROR_CODE_HEADER: &str = "Nats-Service-Error-Code";
pub const SERVICE_ERROR_HEADER: &str = "Nats-Service-Error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MailTemplate {
    EmailVerification,
    ResetPassword,
    EmailChange,
}

impl MailTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            MailTemplate::EmailVerification => "email_verification",
            MailTemplate::ResetPassword => "reset_password",
            MailTemplate::EmailChange => "email_change",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "email_verification" => Some(MailTemplate::EmailVerification),
            "reset_password" => Some(MailTemplate::ResetPassword),
            "email_change" => Some(MailTemplate::EmailChange),
            _ => None,
        }
    }
}

/// `mailer.send` 的请求体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMailRequest {
    #[serde(default)]
    pub request_id: String,
    pub receiver: String,
    pub template_name: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

/// 待发送的邮件
#[derive(Debug, Clone, PartialEq)]
pub struct Mail {
    pub receiver: String,
    pub template: MailTemplate,
    pub options: HashMap<String, String>,
}

impl Mail {
    pub fn with_token(receiver: &str, template: MailTemplate, token: &str) -> Self {
        Self {
            receiver: receiver.to_string(),
            template,
            options: HashMap::from([("token".to_string(), token.to_string())]),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.options.get("token").map(String::as_str)
    }
}

/// 邮件发送客户端
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), AppError>;
}

/// worker 通过回复头返回的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub code: String,
    pub message: String,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mailer replied {}: {}", self.code, self.message)
    }
}

/// 任一错误头非空即视为失败
pub fn check_service_error(headers: Option<&HeaderMap>) -> Result<(), ServiceError> {
    let Some(headers) = headers else {
        return Ok(());
    };
    let code = headers
        .get(SERVICE_ERROR_CODE_HEADER)
        .map(|v| v.as_str().to_string())
        .unwrap_or_default();
    let message = headers
        .get(SERVICE_ERROR_HEADER)
        .map(|v| v.as_str().to_string())
        .unwrap_or_default();

    if code.is_empty() && message.is_empty() {
        Ok(())
    } else {
        Err(ServiceError { code, message })
    }
}

pub fn service_error_headers(code: u16, message: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(SERVICE_ERROR_CODE_HEADER, code.to_string().as_str());
    headers.insert(SERVICE_ERROR_HEADER, message);
    headers
}
