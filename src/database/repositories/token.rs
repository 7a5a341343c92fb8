use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::database::is_unique_violation;
use crate::database::models::token::{OneShotTokenEntity, TokenKind, TokenRedemption};
use crate::error::AppError;
use crate::traits::TokenStore;

/// 一次性令牌存储库，三类令牌共用，按种类选择表
#[derive(Clone)]
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn select_sql(kind: TokenKind) -> String {
    let new_email = match kind {
        TokenKind::ChangeEmail => "new_email",
        _ => "NULL::VARCHAR AS new_email",
    };
    format!(
        "SELECT user_id, token, {new_email}, created_at, expires_at, used_at \
         FROM {} WHERE token = $1 FOR UPDATE",
        kind.table()
    )
}

#[async_trait]
impl TokenStore for TokenRepository {
    async fn create(&self, kind: TokenKind, token: &OneShotTokenEntity) -> Result<(), AppError> {
        match kind {
            TokenKind::ChangeEmail => {
                let new_email = token.new_email.as_deref().ok_or(AppError::InvalidEmail)?;
                sqlx::query(
                    r#"
                    INSERT INTO change_email_tokens (user_id, new_email, token, created_at, expires_at)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(token.user_id)
                .bind(new_email)
                .bind(&token.token)
                .bind(token.created_at)
                .bind(token.expires_at)
                .execute(&self.pool)
                .await?;
            }
            _ => {
                sqlx::query(&format!(
                    "INSERT INTO {} (user_id, token, created_at, expires_at) VALUES ($1, $2, $3, $4)",
                    kind.table()
                ))
                .bind(token.user_id)
                .bind(&token.token)
                .bind(token.created_at)
                .bind(token.expires_at)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    async fn redeem(
        &self,
        token: &str,
        redemption: TokenRedemption,
        now: DateTime<Utc>,
    ) -> Result<OneShotTokenEntity, AppError> {
        let kind = redemption.kind();
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, OneShotTokenEntity>(&select_sql(kind))
            .bind(token)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::TokenNotFound)?;

        record.check_redeemable(now)?;

        sqlx::query(&format!("UPDATE {} SET used_at = $2 WHERE token = $1", kind.table()))
            .bind(token)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        match &redemption {
            TokenRedemption::ActivateUser => {
                let activated: Option<bool> = sqlx::query_scalar(
                    "SELECT activated FROM users WHERE id = $1 FOR UPDATE",
                )
                .bind(record.user_id)
                .fetch_optional(&mut *tx)
                .await?;
                match activated {
                    None => return Err(AppError::UserNotFound),
                    Some(true) => return Err(AppError::AlreadyActivated),
                    Some(false) => {}
                }
                sqlx::query("UPDATE users SET activated = TRUE WHERE id = $1")
                    .bind(record.user_id)
                    .execute(&mut *tx)
                    .await?;
            }
            TokenRedemption::SetPassword { password_hash } => {
                sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
                    .bind(record.user_id)
                    .bind(password_hash)
                    .execute(&mut *tx)
                    .await?;
            }
            TokenRedemption::SetEmail => {
                let new_email = record.new_email.as_deref().ok_or(AppError::InvalidEmail)?;
                sqlx::query("UPDATE users SET email = $2 WHERE id = $1")
                    .bind(record.user_id)
                    .bind(new_email)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        if is_unique_violation(&e, "users_email_key") {
                            AppError::EmailInUse
                        } else {
                            AppError::Database(e)
                        }
                    })?;
            }
        }

        tx.commit().await?;

        Ok(OneShotTokenEntity {
            used_at: Some(now),
            ..record
        })
    }
}
