use std::sync::Arc;

use redis::Client as RedisClient;
use sqlx::PgPool;

use config::Config;
use oauth::OAuthRegistry;
use services::{AuthBackends, AuthService, AuthSettings, NoteService};
use utils::{JwtTokenizer, Sha256Hasher};

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod logging;
pub mod middleware;
pub mod oauth;
pub mod router;
pub mod routes;
pub mod services;
pub mod shutdown;
pub mod traits;
pub mod utils;
pub mod worker;

#[cfg(test)]
pub mod testutil;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub notes: Arc<NoteService>,
    pub auth: Arc<AuthService>,
}

/// 进程级连接，由 main 创建后显式传入
pub struct Connections {
    pub pool: PgPool,
    pub redis: Arc<RedisClient>,
    pub nats: async_nats::Client,
}

impl AppState {
    pub fn new(config: Config, conns: &Connections, oauth: OAuthRegistry) -> Self {
        let note_service = NoteService::new(
            Arc::new(database::NoteRepository::new(conns.pool.clone())),
            Arc::new(cache::NoteCacheOperations::new(
                conns.redis.clone(),
                config.cache_note_ttl,
            )),
            Sha256Hasher::new(config.note_password_salt.clone()),
            config.reserved_slugs.clone(),
        );

        let auth_service = AuthService::new(
            AuthBackends {
                users: Arc::new(database::UserRepository::new(conns.pool.clone())),
                user_cache: Arc::new(cache::UserCacheOperations::new(
                    conns.redis.clone(),
                    config.cache_users_ttl,
                )),
                sessions: Arc::new(database::SessionRepository::new(conns.pool.clone())),
                tokens: Arc::new(database::TokenRepository::new(conns.pool.clone())),
                oauth_states: Arc::new(cache::OAuthStateCacheOperations::new(
                    conns.redis.clone(),
                )),
                mailer: Arc::new(events::NatsMailer::new(
                    conns.nats.clone(),
                    config.mail_request_timeout,
                )),
            },
            Sha256Hasher::new(config.password_salt.clone()),
            JwtTokenizer::new(&config.jwt_signing_key, config.jwt_access_token_ttl),
            oauth,
            AuthSettings::from_config(&config),
        );

        Self {
            config: Arc::new(config),
            notes: Arc::new(note_service),
            auth: Arc::new(auth_service),
        }
    }
}
