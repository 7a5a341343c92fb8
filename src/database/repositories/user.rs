use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::is_unique_violation;
use crate::database::models::user::{NewUser, UserEntity};
use crate::error::AppError;
use crate::traits::UserStore;

const USER_COLUMNS: &str =
    "u.id, u.email, u.username, u.password, u.activated, u.created_at, u.last_login_at";

/// 用户存储库实现
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create(&self, user: NewUser) -> Result<UserEntity, AppError> {
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (email, password, activated)
            VALUES ($1, $2, $3)
            RETURNING id, email, username, password, activated, created_at, last_login_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.activated)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "created user");
                Ok(user)
            }
            Err(e) if is_unique_violation(&e, "users_email_key") => Err(AppError::EmailInUse),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, AppError> {
        let user = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserEntity>, AppError> {
        let user = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_by_oauth_identity(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<UserEntity>, AppError> {
        let user = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users u \
             JOIN user_oauth_identities i ON i.user_id = u.id \
             WHERE i.provider = $1 AND i.provider_id = $2"
        ))
        .bind(provider)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn link_oauth_identity(
        &self,
        user_id: Uuid,
        provider: &str,
        provider_id: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_oauth_identities (user_id, provider, provider_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (provider, provider_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(provider)
        .bind(provider_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn is_activated(&self, id: Uuid) -> Result<bool, AppError> {
        let activated: Option<bool> =
            sqlx::query_scalar("SELECT activated FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(activated.unwrap_or(false))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
