use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::session::SessionEntity;
use crate::error::AppError;
use crate::traits::SessionStore;

/// 会话存储库实现
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn create(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO sessions (user_id, refresh_token, expires_at) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(refresh_token)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionEntity>, AppError> {
        let session = sqlx::query_as::<_, SessionEntity>(
            r#"
            SELECT id, user_id, refresh_token, expires_at
            FROM sessions
            WHERE refresh_token = $1 AND expires_at > $2
            "#,
        )
        .bind(refresh_token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn rotate(
        &self,
        user_id: Uuid,
        old_refresh_token: &str,
        new_refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET refresh_token = $3
            WHERE user_id = $1 AND refresh_token = $2 AND expires_at > $4
            "#,
        )
        .bind(user_id)
        .bind(old_refresh_token)
        .bind(new_refresh_token)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, user_id: Uuid, refresh_token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND refresh_token = $2")
            .bind(user_id)
            .bind(refresh_token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        tracing::debug!(user_id = %user_id, removed = result.rows_affected(), "dropped sessions");
        Ok(())
    }
}
