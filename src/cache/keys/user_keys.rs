use uuid::Uuid;

/// 用户缓存键前缀
const USER_PREFIX: &str = "user:";

/// 生成用户存在标记缓存键
pub fn user_exists_key(user_id: Uuid) -> String {
    format!("{}{}:exists", USER_PREFIX, user_id)
}

/// 生成用户激活标记缓存键
pub fn user_activated_key(user_id: Uuid) -> String {
    format!("{}{}:activated", USER_PREFIX, user_id)
}
