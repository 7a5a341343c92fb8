// 数据库模块
// 包含数据库实体定义和存储库实现

pub mod models; // 数据库实体定义
pub mod repositories; // 存储库实现

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;

use crate::config::Config;

pub use repositories::{NoteRepository, SessionRepository, TokenRepository, UserRepository};

/// 建立连接池
pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'burnbox';").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
}

pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// 是否为指定约束上的唯一性冲突 (23505)
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.constraint().is_none_or(|c| c == constraint)
        }
        _ => false,
    }
}
