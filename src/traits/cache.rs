use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// 笔记元数据，读取它不会消耗笔记
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteMetadata {
    pub created_at: DateTime<Utc>,
    pub has_password: bool,
}

#[async_trait]
pub trait NoteCache: Send + Sync {
    async fn get(&self, slug: &str) -> Result<Option<NoteMetadata>, AppError>;
    async fn set(&self, slug: &str, metadata: &NoteMetadata) -> Result<(), AppError>;
    async fn invalidate(&self, slug: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait UserCache: Send + Sync {
    async fn get_exists(&self, id: Uuid) -> Result<Option<bool>, AppError>;
    async fn set_exists(&self, id: Uuid, exists: bool) -> Result<(), AppError>;
    async fn get_activated(&self, id: Uuid) -> Result<Option<bool>, AppError>;
    async fn set_activated(&self, id: Uuid, activated: bool) -> Result<(), AppError>;
    async fn invalidate(&self, id: Uuid) -> Result<(), AppError>;
}

/// OAuth 回调用的 state，一次性取出
#[async_trait]
pub trait OAuthStateCache: Send + Sync {
    async fn save(&self, state: &str, provider: &str, ttl: Duration) -> Result<(), AppError>;
    async fn take(&self, state: &str) -> Result<Option<String>, AppError>;
}
