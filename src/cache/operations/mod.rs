/// 缓存操作
/// 提供缓存操作的功能实现

// 笔记缓存操作
pub mod note;

// OAuth state 缓存操作
pub mod oauth_state;

// 用户缓存操作
pub mod user;

pub use note::NoteCacheOperations;
pub use oauth_state::OAuthStateCacheOperations;
pub use user::UserCacheOperations;
