// 缓存模块
// 包含缓存数据结构和 Redis 操作

pub mod keys;
pub mod models;
pub mod operations;

pub use operations::{NoteCacheOperations, OAuthStateCacheOperations, UserCacheOperations};

pub(crate) fn serde_error(e: serde_json::Error) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::IoError, "serialization error", e.to_string()))
}
