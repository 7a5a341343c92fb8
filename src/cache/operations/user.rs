use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};
use uuid::Uuid;

use crate::cache::keys::{user_activated_key, user_exists_key};
use crate::error::AppError;
use crate::traits::UserCache;

/// 用户标记缓存操作，值为 "1" / "0"
pub struct UserCacheOperations {
    redis: Arc<RedisClient>,
    ttl: Duration,
}

impl UserCacheOperations {
    pub fn new(redis: Arc<RedisClient>, ttl: Duration) -> Self {
        Self { redis, ttl }
    }

    async fn get_flag(&self, key: String) -> Result<Option<bool>, AppError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value.map(|v| v == "1"))
    }

    async fn set_flag(&self, key: String, flag: bool) -> Result<(), AppError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let value = if flag { "1" } else { "0" };
        let _: () = conn.set_ex(key, value, self.ttl.as_secs().max(1)).await?;
        Ok(())
    }
}

#[async_trait]
impl UserCache for UserCacheOperations {
    async fn get_exists(&self, id: Uuid) -> Result<Option<bool>, AppError> {
        self.get_flag(user_exists_key(id)).await
    }

    async fn set_exists(&self, id: Uuid, exists: bool) -> Result<(), AppError> {
        self.set_flag(user_exists_key(id), exists).await
    }

    async fn get_activated(&self, id: Uuid) -> Result<Option<bool>, AppError> {
        self.get_flag(user_activated_key(id)).await
    }

    async fn set_activated(&self, id: Uuid, activated: bool) -> Result<(), AppError> {
        self.set_flag(user_activated_key(id), activated).await
    }

    async fn invalidate(&self, id: Uuid) -> Result<(), AppError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let _: () = conn
            .del(vec![user_exists_key(id), user_activated_key(id)])
            .await?;
        Ok(())
    }
}
