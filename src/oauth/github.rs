use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;

use crate::config::OAuthClientConfig;
use crate::error::AppError;
use crate::oauth::{OAuthProvider, OAuthUserInfo, parse_access_token};

const AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";
const USER_EMAILS_URL: &str = "https://api.github.com/user/emails";

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitHubEmail {
    email: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    verified: bool,
}

/// 主邮箱优先；没有主邮箱时取第一个邮箱并保留其验证状态
pub(crate) fn pick_email(emails: &[GitHubEmail]) -> Option<(String, bool)> {
    emails
        .iter()
        .find(|e| e.primary)
        .or_else(|| emails.first())
        .map(|e| (e.email.clone(), e.verified))
}

pub struct GitHubProvider {
    config: OAuthClientConfig,
    http: reqwest::Client,
}

impl GitHubProvider {
    pub fn new(config: OAuthClientConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AppError> {
        self.http
            .get(url)
            .bearer_auth(access_token)
            .header(USER_AGENT, "burnbox")
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(AppError::internal)?
            .error_for_status()
            .map_err(AppError::internal)?
            .json()
            .await
            .map_err(AppError::internal)
    }
}

#[async_trait]
impl OAuthProvider for GitHubProvider {
    fn name(&self) -> &'static str {
        "github"
    }

    fn auth_url(&self, state: &str) -> Result<String, AppError> {
        let url = Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("scope", "read:user user:email"),
                ("state", state),
            ],
        )
        .map_err(AppError::internal)?;
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthUserInfo, AppError> {
        let body = self
            .http
            .post(TOKEN_URL)
            .header(ACCEPT, "application/json")
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
            ])
            .send()
            .await
            .map_err(AppError::internal)?
            .text()
            .await
            .map_err(AppError::internal)?;

        let access_token = parse_access_token(&body).map_err(|e| {
            tracing::warn!(provider = "github", error = %e, "code exchange failed");
            AppError::Unauthorized
        })?;

        let user: GitHubUser = self.get_json(USER_URL, &access_token).await?;
        let emails: Vec<GitHubEmail> = self.get_json(USER_EMAILS_URL, &access_token).await?;
        let (email, email_verified) = pick_email(&emails).ok_or(AppError::OAuthEmailUnverified)?;

        Ok(OAuthUserInfo {
            provider: self.name().to_string(),
            provider_id: user.id.to_string(),
            email,
            email_verified,
        })
    }
}
