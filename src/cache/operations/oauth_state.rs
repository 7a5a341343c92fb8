use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};

use crate::cache::keys::oauth_state_key;
use crate::error::AppError;
use crate::traits::OAuthStateCache;

pub struct OAuthStateCacheOperations {
    redis: Arc<RedisClient>,
}

impl OAuthStateCacheOperations {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl OAuthStateCache for OAuthStateCacheOperations {
    async fn save(&self, state: &str, provider: &str, ttl: Duration) -> Result<(), AppError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let _: () = conn
            .set_ex(oauth_state_key(state), provider, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn take(&self, state: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let provider: Option<String> = conn.get_del(oauth_state_key(state)).await?;
        Ok(provider)
    }
}
