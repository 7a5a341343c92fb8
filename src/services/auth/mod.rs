mod oauth;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::database::models::token::{OneShotTokenEntity, TokenKind, TokenRedemption};
use crate::database::models::user::{NewUser, UserEntity};
use crate::error::AppError;
use crate::events::{Mail, MailTemplate, Mailer};
use crate::oauth::OAuthRegistry;
use crate::traits::{OAuthStateCache, SessionStore, TokenStore, UserCache, UserStore};
use crate::utils::{JwtTokenizer, Sha256Hasher, random_token};

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub refresh_token_ttl: Duration,
    pub verification_token_ttl: Duration,
    pub reset_password_token_ttl: Duration,
    pub change_email_token_ttl: Duration,
    pub oauth_state_ttl: Duration,
    pub min_password_length: usize,
    /// 修改密码后是否注销全部会话
    pub logout_on_password_change: bool,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            refresh_token_ttl: config.jwt_refresh_token_ttl,
            verification_token_ttl: config.verification_token_ttl,
            reset_password_token_ttl: config.reset_password_token_ttl,
            change_email_token_ttl: config.change_email_token_ttl,
            oauth_state_ttl: Duration::from_secs(10 * 60),
            min_password_length: config.min_password_length,
            logout_on_password_change: config.logout_on_password_change,
        }
    }
}

/// 认证服务依赖的存储与外部通道
pub struct AuthBackends {
    pub users: Arc<dyn UserStore>,
    pub user_cache: Arc<dyn UserCache>,
    pub sessions: Arc<dyn SessionStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub oauth_states: Arc<dyn OAuthStateCache>,
    pub mailer: Arc<dyn Mailer>,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    user_cache: Arc<dyn UserCache>,
    sessions: Arc<dyn SessionStore>,
    tokens: Arc<dyn TokenStore>,
    oauth_states: Arc<dyn OAuthStateCache>,
    mailer: Arc<dyn Mailer>,
    hasher: Sha256Hasher,
    jwt: JwtTokenizer,
    oauth: OAuthRegistry,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(
        backends: AuthBackends,
        hasher: Sha256Hasher,
        jwt: JwtTokenizer,
        oauth: OAuthRegistry,
        settings: AuthSettings,
    ) -> Self {
        Self {
            users: backends.users,
            user_cache: backends.user_cache,
            sessions: backends.sessions,
            tokens: backends.tokens,
            oauth_states: backends.oauth_states,
            mailer: backends.mailer,
            hasher,
            jwt,
            oauth,
            settings,
        }
    }

    /// 注册后发送验证邮件，邮件发送失败会返回给调用方
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), AppError> {
        let email = normalize_email(email)?;
        self.validate_password(password)?;

        let user = self
            .users
            .create(NewUser {
                email,
                password: self.hasher.hash(password),
                activated: false,
            })
            .await?;

        self.send_verification(&user).await
    }

    pub async fn verify(&self, token: &str) -> Result<(), AppError> {
        let record = self
            .tokens
            .redeem(token, TokenRedemption::ActivateUser, Utc::now())
            .await?;

        self.forget_user(record.user_id).await;
        tracing::info!(user_id = %record.user_id, "user activated");
        Ok(())
    }

    pub async fn resend_verification(&self, email: &str, password: &str) -> Result<(), AppError> {
        let user = self.authenticate(email, password).await?;
        if user.activated {
            return Err(AppError::AlreadyActivated);
        }
        self.send_verification(&user).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = self.authenticate(email, password).await?;
        if !user.activated {
            return Err(AppError::NotActivated);
        }

        self.touch_last_login(user.id).await;
        self.issue_tokens(user.id).await
    }

    pub async fn issue_tokens(&self, user_id: Uuid) -> Result<TokenPair, AppError> {
        let access_token = self.jwt.access_token(user_id).map_err(AppError::internal)?;
        let refresh_token = random_token();

        self.sessions
            .create(
                user_id,
                &refresh_token,
                after(Utc::now(), self.settings.refresh_token_ttl),
            )
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// 旧刷新令牌只能成功使用一次
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let now = Utc::now();
        let session = self
            .sessions
            .find_by_refresh_token(refresh_token, now)
            .await?
            .ok_or(AppError::SessionNotFound)?;

        let access_token = self
            .jwt
            .access_token(session.user_id)
            .map_err(AppError::internal)?;
        let new_refresh_token = random_token();

        let rotated = self
            .sessions
            .rotate(session.user_id, refresh_token, &new_refresh_token, now)
            .await?;
        if !rotated {
            return Err(AppError::SessionNotFound);
        }

        Ok(TokenPair {
            access_token,
            refresh_token: new_refresh_token,
        })
    }

    pub async fn logout(&self, user_id: Uuid, refresh_token: &str) -> Result<(), AppError> {
        self.sessions.delete(user_id, refresh_token).await
    }

    pub async fn logout_all(&self, user_id: Uuid) -> Result<(), AppError> {
        self.sessions.delete_all(user_id).await
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current: &str,
        new: &str,
    ) -> Result<(), AppError> {
        self.validate_password(new)?;

        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        if !self.hasher.compare(&user.password, current) {
            return Err(AppError::WrongCredentials);
        }

        self.users
            .update_password(user_id, &self.hasher.hash(new))
            .await?;

        if self.settings.logout_on_password_change {
            self.sessions.delete_all(user_id).await?;
        }
        Ok(())
    }

    /// 无论用户是否存在都返回成功
    pub async fn request_reset_password(&self, email: &str) -> Result<(), AppError> {
        let email = normalize_email(email)?;
        let Some(user) = self.users.get_by_email(&email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = self
            .mint_token(
                TokenKind::ResetPassword,
                user.id,
                None,
                self.settings.reset_password_token_ttl,
            )
            .await?;

        // 发送失败只记录日志，否则会暴露邮箱是否注册
        if let Err(e) = self
            .mailer
            .send(Mail::with_token(&user.email, MailTemplate::ResetPassword, &token))
            .await
        {
            tracing::error!(user_id = %user.id, error = ?e, "reset password mail not sent");
        }
        Ok(())
    }

    /// 重置成功后注销该用户全部会话
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), AppError> {
        self.validate_password(password)?;

        let record = self
            .tokens
            .redeem(
                token,
                TokenRedemption::SetPassword {
                    password_hash: self.hasher.hash(password),
                },
                Utc::now(),
            )
            .await?;

        self.sessions.delete_all(record.user_id).await?;
        tracing::info!(user_id = %record.user_id, "password reset");
        Ok(())
    }

    pub async fn request_email_change(&self, user_id: Uuid, new_email: &str) -> Result<(), AppError> {
        let new_email = normalize_email(new_email)?;
        if self.users.get_by_email(&new_email).await?.is_some() {
            return Err(AppError::EmailInUse);
        }
        if !self.users.exists(user_id).await? {
            return Err(AppError::Unauthorized);
        }

        let token = self
            .mint_token(
                TokenKind::ChangeEmail,
                user_id,
                Some(new_email.clone()),
                self.settings.change_email_token_ttl,
            )
            .await?;

        self.mailer
            .send(Mail::with_token(&new_email, MailTemplate::EmailChange, &token))
            .await
    }

    pub async fn confirm_email_change(&self, token: &str) -> Result<(), AppError> {
        let record = self
            .tokens
            .redeem(token, TokenRedemption::SetEmail, Utc::now())
            .await?;
        self.forget_user(record.user_id).await;
        Ok(())
    }

    pub async fn check_if_user_exists(&self, user_id: Uuid) -> Result<bool, AppError> {
        match self.user_cache.get_exists(user_id).await {
            Ok(Some(exists)) => return Ok(exists),
            Ok(None) => {}
            Err(e) => tracing::warn!(user_id = %user_id, error = ?e, "user cache read failed"),
        }

        let exists = self.users.exists(user_id).await?;
        if let Err(e) = self.user_cache.set_exists(user_id, exists).await {
            tracing::warn!(user_id = %user_id, error = ?e, "user cache write failed");
        }
        Ok(exists)
    }

    pub async fn is_activated(&self, user_id: Uuid) -> Result<bool, AppError> {
        match self.user_cache.get_activated(user_id).await {
            Ok(Some(activated)) => return Ok(activated),
            Ok(None) => {}
            Err(e) => tracing::warn!(user_id = %user_id, error = ?e, "user cache read failed"),
        }

        let activated = self.users.is_activated(user_id).await?;
        if let Err(e) = self.user_cache.set_activated(user_id, activated).await {
            tracing::warn!(user_id = %user_id, error = ?e, "user cache write failed");
        }
        Ok(activated)
    }

    pub fn parse_access_token(&self, token: &str) -> Option<Uuid> {
        self.jwt.parse(token)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserEntity, AppError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    /// 用户不存在与密码错误返回同一个错误
    async fn authenticate(&self, email: &str, password: &str) -> Result<UserEntity, AppError> {
        let email = normalize_email(email).map_err(|_| AppError::WrongCredentials)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AppError::WrongCredentials)?;

        if !self.hasher.compare(&user.password, password) {
            return Err(AppError::WrongCredentials);
        }
        Ok(user)
    }

    async fn send_verification(&self, user: &UserEntity) -> Result<(), AppError> {
        let token = self
            .mint_token(
                TokenKind::Verification,
                user.id,
                None,
                self.settings.verification_token_ttl,
            )
            .await?;

        self.mailer
            .send(Mail::with_token(
                &user.email,
                MailTemplate::EmailVerification,
                &token,
            ))
            .await
    }

    async fn mint_token(
        &self,
        kind: TokenKind,
        user_id: Uuid,
        new_email: Option<String>,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let record = OneShotTokenEntity {
            user_id,
            token: random_token(),
            new_email,
            created_at: now,
            expires_at: after(now, ttl),
            used_at: None,
        };
        self.tokens.create(kind, &record).await?;
        Ok(record.token)
    }

    fn validate_password(&self, password: &str) -> Result<(), AppError> {
        if password.chars().count() < self.settings.min_password_length {
            return Err(AppError::InvalidPassword);
        }
        Ok(())
    }

    async fn touch_last_login(&self, user_id: Uuid) {
        if let Err(e) = self.users.touch_last_login(user_id, Utc::now()).await {
            tracing::warn!(user_id = %user_id, error = ?e, "failed to record login time");
        }
    }

    async fn forget_user(&self, user_id: Uuid) {
        if let Err(e) = self.user_cache.invalidate(user_id).await {
            tracing::warn!(user_id = %user_id, error = ?e, "user cache invalidation failed");
        }
    }
}

fn after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now + TimeDelta::seconds(ttl.as_secs() as i64)
}

/// 去空白并转小写；要求恰好一个 `@`，域名含 `.`
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@').ok_or(AppError::InvalidEmail)?;

    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@');

    if local.is_empty() || !domain_ok || email.len() > 255 || email.chars().any(char::is_whitespace)
    {
        return Err(AppError::InvalidEmail);
    }
    Ok(email)
}
