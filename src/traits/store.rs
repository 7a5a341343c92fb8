use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::models::note::{NewNote, NoteEntity, NoteFilter};
use crate::database::models::session::SessionEntity;
use crate::database::models::token::{OneShotTokenEntity, TokenKind, TokenRedemption};
use crate::database::models::user::{NewUser, UserEntity};
use crate::error::AppError;

/// 笔记持久化
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// 插入笔记，作者存在时同一事务内写入 notes_authors
    async fn create(&self, note: NewNote, author: Option<Uuid>) -> Result<NoteEntity, AppError>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<NoteEntity>, AppError>;

    /// 仅当 read_at 为空时删除，返回删除前的内容
    async fn burn(&self, id: Uuid) -> Result<Option<String>, AppError>;

    /// 仅当 read_at 为空时清空内容并写入 read_at，返回清空前的内容
    async fn mark_read(&self, id: Uuid, read_at: DateTime<Utc>)
    -> Result<Option<String>, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;

    async fn is_author(&self, id: Uuid, user_id: Uuid) -> Result<bool, AppError>;

    async fn update_expiration(
        &self,
        id: Uuid,
        expires_at: Option<DateTime<Utc>>,
        burn_before_expiration: bool,
    ) -> Result<(), AppError>;

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError>;

    async fn list_by_author(
        &self,
        user_id: Uuid,
        filter: NoteFilter,
    ) -> Result<Vec<NoteEntity>, AppError>;

    async fn count_by_author(&self, user_id: Uuid) -> Result<i64, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// 邮箱冲突时返回 `AppError::EmailInUse`
    async fn create(&self, user: NewUser) -> Result<UserEntity, AppError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, AppError>;
    async fn get_by_email(&self, email: &str) -> Result<Option<UserEntity>, AppError>;
    async fn get_by_oauth_identity(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<UserEntity>, AppError>;
    /// 幂等，已存在的关联不会重复写入
    async fn link_oauth_identity(
        &self,
        user_id: Uuid,
        provider: &str,
        provider_id: &str,
    ) -> Result<(), AppError>;
    async fn exists(&self, id: Uuid) -> Result<bool, AppError>;
    async fn is_activated(&self, id: Uuid) -> Result<bool, AppError>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError>;
    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// 过期的会话视为不存在
    async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionEntity>, AppError>;

    /// 按 (user_id, old) 条件更新，返回是否命中
    async fn rotate(
        &self,
        user_id: Uuid,
        old_refresh_token: &str,
        new_refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    async fn delete(&self, user_id: Uuid, refresh_token: &str) -> Result<(), AppError>;

    async fn delete_all(&self, user_id: Uuid) -> Result<(), AppError>;
}

/// 验证、重置密码、修改邮箱三类一次性令牌
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn create(&self, kind: TokenKind, token: &OneShotTokenEntity) -> Result<(), AppError>;

    /// 在一个事务中校验令牌、标记已使用并执行副作用
    async fn redeem(
        &self,
        token: &str,
        redemption: TokenRedemption,
        now: DateTime<Utc>,
    ) -> Result<OneShotTokenEntity, AppError>;
}
