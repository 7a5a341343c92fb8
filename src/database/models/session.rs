use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// 会话数据库实体
#[derive(Debug, Clone, FromRow)]
pub struct SessionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}
