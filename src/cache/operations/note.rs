use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};

use crate::cache::keys::note_metadata_key;
use crate::cache::models::CachedNoteMetadata;
use crate::cache::serde_error;
use crate::error::AppError;
use crate::traits::{NoteCache, NoteMetadata};

/// 笔记元数据缓存操作
pub struct NoteCacheOperations {
    redis: Arc<RedisClient>,
    ttl: Duration,
}

impl NoteCacheOperations {
    pub fn new(redis: Arc<RedisClient>, ttl: Duration) -> Self {
        Self { redis, ttl }
    }
}

#[async_trait]
impl NoteCache for NoteCacheOperations {
    async fn get(&self, slug: &str) -> Result<Option<NoteMetadata>, AppError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let result: Option<String> = conn.get(note_metadata_key(slug)).await?;

        match result {
            Some(json) => {
                let cached: CachedNoteMetadata = serde_json::from_str(&json).map_err(serde_error)?;
                Ok(cached.into_metadata())
            }
            None => Ok(None),
        }
    }

    async fn set(&self, slug: &str, metadata: &NoteMetadata) -> Result<(), AppError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let json =
            serde_json::to_string(&CachedNoteMetadata::from(metadata)).map_err(serde_error)?;
        let _: () = conn
            .set_ex(note_metadata_key(slug), json, self.ttl.as_secs().max(1))
            .await?;

        Ok(())
    }

    async fn invalidate(&self, slug: &str) -> Result<(), AppError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let _: () = conn.del(note_metadata_key(slug)).await?;
        Ok(())
    }
}
