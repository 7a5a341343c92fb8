use super::{AuthService, TokenPair, normalize_email};
use crate::database::models::user::{NewUser, UserEntity};
use crate::error::AppError;
use crate::oauth::{OAuthProvider, OAuthUserInfo};
use crate::utils::random_token;

use std::sync::Arc;

impl AuthService {
    fn provider(&self, name: &str) -> Result<&Arc<dyn OAuthProvider>, AppError> {
        self.oauth
            .get(name)
            .ok_or(AppError::OAuthProviderNotSupported)
    }

    /// 生成 state 并返回提供方授权地址
    pub async fn oauth_url(&self, provider: &str) -> Result<String, AppError> {
        let provider = self.provider(provider)?;
        let state = random_token();

        self.oauth_states
            .save(&state, provider.name(), self.settings.oauth_state_ttl)
            .await?;

        provider.auth_url(&state)
    }

    pub async fn oauth_callback(
        &self,
        provider: &str,
        code: &str,
        state: &str,
    ) -> Result<TokenPair, AppError> {
        let provider = self.provider(provider)?;

        match self.oauth_states.take(state).await? {
            Some(saved) if saved == provider.name() => {}
            _ => return Err(AppError::OAuthInvalidState),
        }

        let info = provider.exchange_code(code).await?;
        self.oauth_login(info).await
    }

    /// 按 身份 → 邮箱 → 新建 的顺序找到用户，关联身份后签发令牌
    pub async fn oauth_login(&self, info: OAuthUserInfo) -> Result<TokenPair, AppError> {
        if !info.email_verified {
            return Err(AppError::OAuthEmailUnverified);
        }

        let user = match self
            .users
            .get_by_oauth_identity(&info.provider, &info.provider_id)
            .await?
        {
            Some(user) => user,
            None => self.find_or_create_oauth_user(&info.email).await?,
        };

        self.users
            .link_oauth_identity(user.id, &info.provider, &info.provider_id)
            .await?;

        self.touch_last_login(user.id).await;
        tracing::info!(user_id = %user.id, provider = %info.provider, "oauth login");
        self.issue_tokens(user.id).await
    }

    async fn find_or_create_oauth_user(&self, email: &str) -> Result<UserEntity, AppError> {
        let email = normalize_email(email)?;
        if let Some(user) = self.users.get_by_email(&email).await? {
            return Ok(user);
        }

        let created = self
            .users
            .create(NewUser {
                email: email.clone(),
                password: String::new(),
                activated: true,
            })
            .await;

        match created {
            Ok(user) => Ok(user),
            // 并发回调抢先创建了同一邮箱
            Err(AppError::EmailInUse) => self
                .users
                .get_by_email(&email)
                .await?
                .ok_or(AppError::EmailInUse),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::oauth::OAuthUserInfo;
    use crate::testutil::AuthFixture;

    fn google(pid: &str, email: &str, verified: bool) -> OAuthUserInfo {
        OAuthUserInfo {
            provider: "google".into(),
            provider_id: pid.into(),
            email: email.into(),
            email_verified: verified,
        }
    }

    #[tokio::test]
    async fn first_login_creates_activated_user_without_password() {
        let f = AuthFixture::new();
        let pair = f.service.oauth_login(google("pid", "U@x.io", true)).await.unwrap();
        assert!(f.service.parse_access_token(&pair.access_token).is_some());

        let user = f.users.find("u@x.io").unwrap();
        assert!(user.activated);
        assert!(user.password.is_empty());
        assert_eq!(f.users.identity_count(), 1);

        // 没有密码的账户不能用密码登录
        assert!(matches!(
            f.service.sign_in("u@x.io", "").await.unwrap_err(),
            AppError::WrongCredentials
        ));
    }

    #[tokio::test]
    async fn repeated_login_reuses_user_and_link() {
        let f = AuthFixture::new();
        f.service.oauth_login(google("pid", "u@x.io", true)).await.unwrap();
        f.service.oauth_login(google("pid", "u@x.io", true)).await.unwrap();
        assert_eq!(f.users.count(), 1);
        assert_eq!(f.users.identity_count(), 1);
    }

    #[tokio::test]
    async fn links_existing_account_by_email() {
        let f = AuthFixture::new();
        let existing = f.activated_user("u@x.io", "password", true).await;
        f.service.oauth_login(google("pid", "u@x.io", true)).await.unwrap();
        assert_eq!(f.users.count(), 1);
        assert_eq!(f.users.find("u@x.io").unwrap().id, existing.id);
        assert!(f.service.sign_in("u@x.io", "password").await.is_ok());
    }

    #[tokio::test]
    async fn unverified_email_is_rejected() {
        let f = AuthFixture::new();
        assert!(matches!(
            f.service
                .oauth_login(google("pid", "u@x.io", false))
                .await
                .unwrap_err(),
            AppError::OAuthEmailUnverified
        ));
        assert_eq!(f.users.count(), 0);
    }

    #[tokio::test]
    async fn callback_requires_matching_state() {
        let f = AuthFixture::new();
        assert!(matches!(
            f.service.oauth_url("gitlab").await.unwrap_err(),
            AppError::OAuthProviderNotSupported
        ));

        let url = f.service.oauth_url("google").await.unwrap();
        let state = url.rsplit("state=").next().unwrap().to_string();

        assert!(matches!(
            f.service
                .oauth_callback("google", "code", "forged")
                .await
                .unwrap_err(),
            AppError::OAuthInvalidState
        ));

        f.service
            .oauth_callback("google", "code", &state)
            .await
            .unwrap();
        // state 只能使用一次
        assert!(matches!(
            f.service
                .oauth_callback("google", "code", &state)
                .await
                .unwrap_err(),
            AppError::OAuthInvalidState
        ));
    }
}
