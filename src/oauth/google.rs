use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::config::OAuthClientConfig;
use crate::error::AppError;
use crate::oauth::{OAuthProvider, OAuthUserInfo, parse_access_token};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USER_INFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    email_verified: bool,
}

pub struct GoogleProvider {
    config: OAuthClientConfig,
    http: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(config: OAuthClientConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn auth_url(&self, state: &str) -> Result<String, AppError> {
        let url = Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", "openid email"),
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
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(AppError::internal)?
            .text()
            .await
            .map_err(AppError::internal)?;

        let access_token = parse_access_token(&body).map_err(|e| {
            tracing::warn!(provider = "google", error = %e, "code exchange failed");
            AppError::Unauthorized
        })?;

        let info: GoogleUserInfo = self
            .http
            .get(USER_INFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(AppError::internal)?
            .error_for_status()
            .map_err(AppError::internal)?
            .json()
            .await
            .map_err(AppError::internal)?;

        Ok(OAuthUserInfo {
            provider: self.name().to_string(),
            provider_id: info.sub,
            email: info.email,
            email_verified: info.email_verified,
        })
    }
}
