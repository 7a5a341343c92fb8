// OAuth 登录：各提供方实现同一组能力，由注册表按名称查找
pub mod github;
pub mod google;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::error::AppError;

pub use github::GitHubProvider;
pub use google::GoogleProvider;

/// 提供方返回的已验证身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthUserInfo {
    pub provider: String,
    pub provider_id: String,
    pub email: String,
    pub email_verified: bool,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn auth_url(&self, state: &str) -> Result<String, AppError>;

    async fn exchange_code(&self, code: &str) -> Result<OAuthUserInfo, AppError>;
}

pub type OAuthRegistry = HashMap<String, Arc<dyn OAuthProvider>>;

/// 只注册配置了 client id 与 secret 的提供方
pub fn registry_from_config(config: &Config, http: reqwest::Client) -> OAuthRegistry {
    let mut registry: OAuthRegistry = HashMap::new();

    if config.google.is_configured() {
        let provider = GoogleProvider::new(config.google.clone(), http.clone());
        registry.insert(provider.name().to_string(), Arc::new(provider));
    }
    if config.github.is_configured() {
        let provider = GitHubProvider::new(config.github.clone(), http);
        registry.insert(provider.name().to_string(), Arc::new(provider));
    }

    tracing::info!(providers = ?registry.keys().collect::<Vec<_>>(), "oauth providers registered");
    registry
}

/// 从 token 交换响应中取出 access_token，提供方的错误信息原样带出
pub(crate) fn parse_access_token(body: &str) -> Result<String, String> {
    let value: Value =
        serde_json::from_str(body).map_err(|_| "token response is not json".to_string())?;

    if let Some(token) = value.get("access_token").and_then(Value::as_str) {
        return Ok(token.to_string());
    }

    match value.get("error").and_then(Value::as_str) {
        Some(error) => {
            let description = value
                .get("error_description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Err(format!("provider returned '{error}' {description}").trim_end().to_string())
        }
        None => Err("token response missing access_token".to_string()),
    }
}
