/// 缓存键模块
/// 提供各种缓存键生成函数

// 笔记缓存键
pub mod note_keys;

// OAuth state 缓存键
pub mod oauth_keys;

// 用户缓存键
pub mod user_keys;

pub use note_keys::note_metadata_key;
pub use oauth_keys::oauth_state_key;
pub use user_keys::{user_activated_key, user_exists_key};
