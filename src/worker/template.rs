use std::collections::HashMap;

use crate::events::MailTemplate;

use super::WorkerError;

/// 渲染后的邮件
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMail {
    pub subject: String,
    pub html: String,
}

/// 根据模板生成邮件正文，链接指向 API 或前端
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    app_url: String,
    frontend_url: String,
}

impl TemplateRenderer {
    pub fn new(app_url: impl Into<String>, frontend_url: impl Into<String>) -> Self {
        Self {
            app_url: app_url.into().trim_end_matches('/').to_string(),
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn render(
        &self,
        template: MailTemplate,
        options: &HashMap<String, String>,
    ) -> Result<RenderedMail, WorkerError> {
        let token = options
            .get("token")
            .map(String::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(WorkerError::MissingOption("token"))?;

        let rendered = match template {
            MailTemplate::EmailVerification => {
                let link = format!("{}/api/v1/auth/verify/{}", self.app_url, token);
                RenderedMail {
                    subject: "Burnbox: verify your email".into(),
                    html: link_body("To verify your email, please follow this link:", &link),
                }
            }
            MailTemplate::ResetPassword => {
                let link = format!("{}/reset-password?token={}", self.frontend_url, token);
                RenderedMail {
                    subject: "Burnbox: reset your password".into(),
                    html: link_body("To reset your password, please follow this link:", &link),
                }
            }
            MailTemplate::EmailChange => {
                let link = format!("{}/api/v1/auth/change-email/{}", self.app_url, token);
                RenderedMail {
                    subject: "Burnbox: confirm your new email".into(),
                    html: link_body("To confirm your new email, please follow this link:", &link),
                }
            }
        };
        Ok(rendered)
    }
}

fn link_body(intro: &str, link: &str) -> String {
    format!(
        "{intro}\n<a href=\"{link}\">{link}</a>\n<br />\n<br />\nIf you did not request this, you can ignore this email."
    )
}
