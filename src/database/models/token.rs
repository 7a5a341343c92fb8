use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// 一次性令牌的种类，各自对应一张表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Verification,
    ResetPassword,
    ChangeEmail,
}

impl TokenKind {
    pub fn table(&self) -> &'static str {
        match self {
            TokenKind::Verification => "verification_tokens",
            TokenKind::ResetPassword => "password_reset_tokens",
            TokenKind::ChangeEmail => "change_email_tokens",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct OneShotTokenEntity {
    pub user_id: Uuid,
    pub token: String,
    /// 只有修改邮箱的令牌携带
    #[sqlx(default)]
    pub new_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl OneShotTokenEntity {
    /// 按 未使用 → 未过期 的顺序检查
    pub fn check_redeemable(&self, now: DateTime<Utc>) -> Result<(), crate::error::AppError> {
        if self.used_at.is_some() {
            return Err(crate::error::AppError::TokenAlreadyUsed);
        }
        if self.expires_at <= now {
            return Err(crate::error::AppError::TokenExpired);
        }
        Ok(())
    }
}

/// 兑换令牌时在同一事务中执行的副作用
#[derive(Debug, Clone)]
pub enum TokenRedemption {
    ActivateUser,
    SetPassword { password_hash: String },
    SetEmail,
}

impl TokenRedemption {
    pub fn kind(&self) -> TokenKind {
        match self {
            TokenRedemption::ActivateUser => TokenKind::Verification,
            TokenRedemption::SetPassword { .. } => TokenKind::ResetPassword,
            TokenRedemption::SetEmail => TokenKind::ChangeEmail,
        }
    }
}
