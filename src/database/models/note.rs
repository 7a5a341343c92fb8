use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// 笔记数据库实体
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NoteEntity {
    pub id: Uuid,
    pub content: String,
    pub slug: String,
    /// 密码哈希，空字符串表示无密码
    pub password: String,
    pub burn_before_expiration: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NoteEntity {
    /// 到期时刻本身即视为已过期
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }

    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    /// 首次读取后删除整行，而不是只清空内容
    pub fn burns_on_read(&self) -> bool {
        self.burn_before_expiration || self.expires_at.is_none()
    }
}

/// 新建笔记，密码已哈希
#[derive(Debug, Clone)]
pub struct NewNote {
    pub content: String,
    pub slug: String,
    pub password: String,
    pub burn_before_expiration: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteFilter {
    All,
    Read,
    Unread,
}

impl NoteFilter {
    pub fn matches(&self, note: &NoteEntity) -> bool {
        match self {
            NoteFilter::All => true,
            NoteFilter::Read => note.is_read(),
            NoteFilter::Unread => !note.is_read(),
        }
    }
}
