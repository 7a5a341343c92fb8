//! 内存实现的存储、缓存、邮件与 OAuth，供单元测试与路由测试使用

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::cache::keys::{user_activated_key, user_exists_key};
use crate::config::{Config, LogFormat, OAuthClientConfig, RateLimitConfig};
use crate::database::models::note::{NewNote, NoteEntity, NoteFilter};
use crate::database::models::session::SessionEntity;
use crate::database::models::token::{OneShotTokenEntity, TokenKind, TokenRedemption};
use crate::database::models::user::{NewUser, UserEntity};
use crate::error::AppError;
use crate::events::{Mail, Mailer};
use crate::oauth::{OAuthProvider, OAuthRegistry, OAuthUserInfo};
use crate::services::{AuthService, AuthSettings, NoteService};
use crate::services::auth::AuthBackends;
use crate::traits::{
    NoteCache, NoteMetadata, NoteStore, OAuthStateCache, SessionStore, TokenStore, UserCache,
    UserStore,
};
use crate::utils::{JwtTokenizer, Sha256Hasher};
use crate::AppState;

fn cache_down() -> AppError {
    AppError::Internal("cache unavailable".into())
}

// ---------- 笔记 ----------

#[derive(Default)]
struct NoteTables {
    notes: HashMap<Uuid, NoteEntity>,
    authors: HashMap<Uuid, Uuid>,
}

#[derive(Default)]
pub struct MemoryNoteStore {
    inner: Mutex<NoteTables>,
}

impl MemoryNoteStore {
    pub fn get(&self, slug: &str) -> Option<NoteEntity> {
        let tables = self.inner.lock().unwrap();
        tables.notes.values().find(|n| n.slug == slug).cloned()
    }

    pub fn insert_raw(
        &self,
        slug: &str,
        content: &str,
        expires_at: Option<DateTime<Utc>>,
        burn_before_expiration: bool,
    ) -> NoteEntity {
        let note = NoteEntity {
            id: Uuid::new_v4(),
            content: content.into(),
            slug: slug.into(),
            password: String::new(),
            burn_before_expiration,
            read_at: None,
            created_at: Utc::now() - TimeDelta::hours(1),
            expires_at,
        };
        self.inner
            .lock()
            .unwrap()
            .notes
            .insert(note.id, note.clone());
        note
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn create(&self, note: NewNote, author: Option<Uuid>) -> Result<NoteEntity, AppError> {
        let mut tables = self.inner.lock().unwrap();
        if tables.notes.values().any(|n| n.slug == note.slug) {
            return Err(AppError::NoteSlugInUse);
        }
        let entity = NoteEntity {
            id: Uuid::new_v4(),
            content: note.content,
            slug: note.slug,
            password: note.password,
            burn_before_expiration: note.burn_before_expiration,
            read_at: None,
            created_at: note.created_at,
            expires_at: note.expires_at,
        };
        tables.notes.insert(entity.id, entity.clone());
        if let Some(user_id) = author {
            tables.authors.insert(entity.id, user_id);
        }
        Ok(entity)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<NoteEntity>, AppError> {
        Ok(self.get(slug))
    }

    async fn burn(&self, id: Uuid) -> Result<Option<String>, AppError> {
        let mut tables = self.inner.lock().unwrap();
        let unread = tables.notes.get(&id).is_some_and(|n| n.read_at.is_none());
        if !unread {
            return Ok(None);
        }
        tables.authors.remove(&id);
        Ok(tables.notes.remove(&id).map(|n| n.content))
    }

    async fn mark_read(
        &self,
        id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<Option<String>, AppError> {
        let mut tables = self.inner.lock().unwrap();
        match tables.notes.get_mut(&id) {
            Some(note) if note.read_at.is_none() => {
                note.read_at = Some(read_at);
                Ok(Some(std::mem::take(&mut note.content)))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.inner.lock().unwrap();
        tables.notes.remove(&id);
        tables.authors.remove(&id);
        Ok(())
    }

    async fn is_author(&self, id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.inner.lock().unwrap().authors.get(&id) == Some(&user_id))
    }

    async fn update_expiration(
        &self,
        id: Uuid,
        expires_at: Option<DateTime<Utc>>,
        burn_before_expiration: bool,
    ) -> Result<(), AppError> {
        if let Some(note) = self.inner.lock().unwrap().notes.get_mut(&id) {
            note.expires_at = expires_at;
            note.burn_before_expiration = burn_before_expiration;
        }
        Ok(())
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        if let Some(note) = self.inner.lock().unwrap().notes.get_mut(&id) {
            note.password = password_hash.to_string();
        }
        Ok(())
    }

    async fn list_by_author(
        &self,
        user_id: Uuid,
        filter: NoteFilter,
    ) -> Result<Vec<NoteEntity>, AppError> {
        let tables = self.inner.lock().unwrap();
        let mut notes: Vec<NoteEntity> = tables
            .authors
            .iter()
            .filter(|(_, author)| **author == user_id)
            .filter_map(|(id, _)| tables.notes.get(id))
            .filter(|n| filter.matches(n))
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    async fn count_by_author(&self, user_id: Uuid) -> Result<i64, AppError> {
        let tables = self.inner.lock().unwrap();
        Ok(tables.authors.values().filter(|a| **a == user_id).count() as i64)
    }
}

#[derive(Default)]
pub struct MemoryNoteCache {
    entries: Mutex<HashMap<String, NoteMetadata>>,
    failing: AtomicBool,
}

impl MemoryNoteCache {
    pub fn contains(&self, slug: &str) -> bool {
        self.entries.lock().unwrap().contains_key(slug)
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(cache_down())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NoteCache for MemoryNoteCache {
    async fn get(&self, slug: &str) -> Result<Option<NoteMetadata>, AppError> {
        self.check()?;
        Ok(self.entries.lock().unwrap().get(slug).cloned())
    }

    async fn set(&self, slug: &str, metadata: &NoteMetadata) -> Result<(), AppError> {
        self.check()?;
        self.entries
            .lock()
            .unwrap()
            .insert(slug.to_string(), metadata.clone());
        Ok(())
    }

    async fn invalidate(&self, slug: &str) -> Result<(), AppError> {
        self.check()?;
        self.entries.lock().unwrap().remove(slug);
        Ok(())
    }
}

// ---------- 用户与会话 ----------

#[derive(Default)]
struct UserTables {
    users: HashMap<Uuid, UserEntity>,
    identities: HashSet<(String, String, Uuid)>,
}

#[derive(Default)]
pub struct MemoryUserStore {
    inner: Mutex<UserTables>,
}

impl MemoryUserStore {
    pub fn find(&self, email: &str) -> Option<UserEntity> {
        let tables = self.inner.lock().unwrap();
        tables.users.values().find(|u| u.email == email).cloned()
    }

    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().users.len()
    }

    pub fn identity_count(&self) -> usize {
        self.inner.lock().unwrap().identities.len()
    }

    fn apply(&self, user_id: Uuid, redemption: &TokenRedemption, new_email: Option<&str>) -> Result<(), AppError> {
        let mut tables = self.inner.lock().unwrap();
        if let (TokenRedemption::SetEmail, Some(email)) = (redemption, new_email) {
            if tables.users.values().any(|u| u.email == email && u.id != user_id) {
                return Err(AppError::EmailInUse);
            }
        }
        let user = tables.users.get_mut(&user_id).ok_or(AppError::UserNotFound)?;
        match redemption {
            TokenRedemption::ActivateUser if user.activated => return Err(AppError::AlreadyActivated),
            TokenRedemption::ActivateUser => user.activated = true,
            TokenRedemption::SetPassword { password_hash } => user.password = password_hash.clone(),
            TokenRedemption::SetEmail => {
                user.email = new_email.ok_or(AppError::InvalidEmail)?.to_string()
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<UserEntity, AppError> {
        let mut tables = self.inner.lock().unwrap();
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::EmailInUse);
        }
        let now = Utc::now();
        let entity = UserEntity {
            id: Uuid::new_v4(),
            email: user.email,
            username: None,
            password: user.password,
            activated: user.activated,
            created_at: now,
            last_login_at: now,
        };
        tables.users.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, AppError> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserEntity>, AppError> {
        Ok(self.find(email))
    }

    async fn get_by_oauth_identity(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<UserEntity>, AppError> {
        let tables = self.inner.lock().unwrap();
        Ok(tables
            .identities
            .iter()
            .find(|(p, pid, _)| p == provider && pid == provider_id)
            .and_then(|(_, _, user_id)| tables.users.get(user_id))
            .cloned())
    }

    async fn link_oauth_identity(
        &self,
        user_id: Uuid,
        provider: &str,
        provider_id: &str,
    ) -> Result<(), AppError> {
        let mut tables = self.inner.lock().unwrap();
        let linked = tables
            .identities
            .iter()
            .any(|(p, pid, _)| p == provider && pid == provider_id);
        if !linked {
            tables
                .identities
                .insert((provider.to_string(), provider_id.to_string(), user_id));
        }
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.inner.lock().unwrap().users.contains_key(&id))
    }

    async fn is_activated(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .get(&id)
            .is_some_and(|u| u.activated))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        if let Some(user) = self.inner.lock().unwrap().users.get_mut(&id) {
            user.password = password_hash.to_string();
        }
        Ok(())
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(user) = self.inner.lock().unwrap().users.get_mut(&id) {
            user.last_login_at = at;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryUserCache {
    flags: Mutex<HashMap<String, bool>>,
    failing: AtomicBool,
}

impl MemoryUserCache {
    pub fn activated(&self, id: Uuid) -> Option<bool> {
        self.flags
            .lock()
            .unwrap()
            .get(&user_activated_key(id))
            .copied()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn get(&self, key: String) -> Result<Option<bool>, AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(cache_down());
        }
        Ok(self.flags.lock().unwrap().get(&key).copied())
    }

    fn set(&self, key: String, flag: bool) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(cache_down());
        }
        self.flags.lock().unwrap().insert(key, flag);
        Ok(())
    }
}

#[async_trait]
impl UserCache for MemoryUserCache {
    async fn get_exists(&self, id: Uuid) -> Result<Option<bool>, AppError> {
        self.get(user_exists_key(id))
    }

    async fn set_exists(&self, id: Uuid, exists: bool) -> Result<(), AppError> {
        self.set(user_exists_key(id), exists)
    }

    async fn get_activated(&self, id: Uuid) -> Result<Option<bool>, AppError> {
        self.get(user_activated_key(id))
    }

    async fn set_activated(&self, id: Uuid, activated: bool) -> Result<(), AppError> {
        self.set(user_activated_key(id), activated)
    }

    async fn invalidate(&self, id: Uuid) -> Result<(), AppError> {
        let mut flags = self.flags.lock().unwrap();
        flags.remove(&user_exists_key(id));
        flags.remove(&user_activated_key(id));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<Vec<SessionEntity>>,
}

impl MemorySessionStore {
    pub fn count(&self, user_id: Uuid) -> usize {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.sessions.lock().unwrap().push(SessionEntity {
            id: Uuid::new_v4(),
            user_id,
            refresh_token: refresh_token.to_string(),
            expires_at,
        });
        Ok(())
    }

    async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionEntity>, AppError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.refresh_token == refresh_token && s.expires_at > now)
            .cloned())
    }

    async fn rotate(
        &self,
        user_id: Uuid,
        old_refresh_token: &str,
        new_refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.iter_mut().find(|s| {
            s.user_id == user_id && s.refresh_token == old_refresh_token && s.expires_at > now
        }) {
            Some(session) => {
                session.refresh_token = new_refresh_token.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, user_id: Uuid, refresh_token: &str) -> Result<(), AppError> {
        self.sessions
            .lock()
            .unwrap()
            .retain(|s| !(s.user_id == user_id && s.refresh_token == refresh_token));
        Ok(())
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<(), AppError> {
        self.sessions.lock().unwrap().retain(|s| s.user_id != user_id);
        Ok(())
    }
}

pub struct MemoryTokenStore {
    users: Arc<MemoryUserStore>,
    tokens: Mutex<HashMap<(TokenKind, String), OneShotTokenEntity>>,
}

impl MemoryTokenStore {
    pub fn new(users: Arc<MemoryUserStore>) -> Self {
        Self {
            users,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert_expired(&self, kind: TokenKind, user_id: Uuid, token: &str) {
        let now = Utc::now();
        self.tokens.lock().unwrap().insert(
            (kind, token.to_string()),
            OneShotTokenEntity {
                user_id,
                token: token.to_string(),
                new_email: None,
                created_at: now - TimeDelta::hours(2),
                expires_at: now - TimeDelta::hours(1),
                used_at: None,
            },
        );
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn create(&self, kind: TokenKind, token: &OneShotTokenEntity) -> Result<(), AppError> {
        self.tokens
            .lock()
            .unwrap()
            .insert((kind, token.token.clone()), token.clone());
        Ok(())
    }

    async fn redeem(
        &self,
        token: &str,
        redemption: TokenRedemption,
        now: DateTime<Utc>,
    ) -> Result<OneShotTokenEntity, AppError> {
        let mut tokens = self.tokens.lock().unwrap();
        let record = tokens
            .get_mut(&(redemption.kind(), token.to_string()))
            .ok_or(AppError::TokenNotFound)?;
        record.check_redeemable(now)?;

        self.users
            .apply(record.user_id, &redemption, record.new_email.as_deref())?;
        record.used_at = Some(now);
        Ok(record.clone())
    }
}

#[derive(Default)]
pub struct MemoryOAuthStateCache {
    states: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl OAuthStateCache for MemoryOAuthStateCache {
    async fn save(&self, state: &str, provider: &str, _ttl: Duration) -> Result<(), AppError> {
        self.states
            .lock()
            .unwrap()
            .insert(state.to_string(), provider.to_string());
        Ok(())
    }

    async fn take(&self, state: &str) -> Result<Option<String>, AppError> {
        Ok(self.states.lock().unwrap().remove(state))
    }
}

// ---------- 邮件与 OAuth ----------

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Mail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Mail> {
        self.sent.lock().unwrap().last().cloned()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: Mail) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::MailDispatchFailed("no responders".into()));
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

/// 固定返回同一个已验证身份
pub struct FakeOAuthProvider {
    pub info: OAuthUserInfo,
}

impl Default for FakeOAuthProvider {
    fn default() -> Self {
        Self {
            info: OAuthUserInfo {
                provider: "google".into(),
                provider_id: "google-123".into(),
                email: "oauth@example.com".into(),
                email_verified: true,
            },
        }
    }
}

#[async_trait]
impl OAuthProvider for FakeOAuthProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn auth_url(&self, state: &str) -> Result<String, AppError> {
        Ok(format!("https://accounts.example/auth?client_id=test&state={state}"))
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthUserInfo, AppError> {
        if code.is_empty() {
            return Err(AppError::Unauthorized);
        }
        Ok(self.info.clone())
    }
}

// ---------- 组装 ----------

pub const TEST_PASSWORD_SALT: &str = "test-password-salt";
pub const TEST_JWT_KEY: &str = "test-signing-key";

pub fn test_settings() -> AuthSettings {
    AuthSettings {
        refresh_token_ttl: Duration::from_secs(3600),
        verification_token_ttl: Duration::from_secs(3600),
        reset_password_token_ttl: Duration::from_secs(3600),
        change_email_token_ttl: Duration::from_secs(3600),
        oauth_state_ttl: Duration::from_secs(600),
        min_password_length: 6,
        logout_on_password_change: false,
    }
}

pub struct AuthFixture {
    pub service: AuthService,
    pub users: Arc<MemoryUserStore>,
    pub user_cache: Arc<MemoryUserCache>,
    pub sessions: Arc<MemorySessionStore>,
    pub tokens: Arc<MemoryTokenStore>,
    pub mailer: Arc<RecordingMailer>,
}

impl AuthFixture {
    pub fn new() -> Self {
        Self::with_settings(|_| {})
    }

    pub fn with_settings(adjust: impl FnOnce(&mut AuthSettings)) -> Self {
        let mut settings = test_settings();
        adjust(&mut settings);

        let users = Arc::new(MemoryUserStore::default());
        let user_cache = Arc::new(MemoryUserCache::default());
        let sessions = Arc::new(MemorySessionStore::default());
        let tokens = Arc::new(MemoryTokenStore::new(users.clone()));
        let mailer = Arc::new(RecordingMailer::default());

        let service = build_auth_service(
            users.clone(),
            user_cache.clone(),
            sessions.clone(),
            tokens.clone(),
            mailer.clone(),
            settings,
        );

        Self {
            service,
            users,
            user_cache,
            sessions,
            tokens,
            mailer,
        }
    }

    /// 直接写入一个用户，跳过注册流程
    pub async fn activated_user(&self, email: &str, password: &str, activated: bool) -> UserEntity {
        self.users
            .create(NewUser {
                email: email.to_string(),
                password: Sha256Hasher::new(TEST_PASSWORD_SALT).hash(password),
                activated,
            })
            .await
            .unwrap()
    }
}

fn build_auth_service(
    users: Arc<MemoryUserStore>,
    user_cache: Arc<MemoryUserCache>,
    sessions: Arc<MemorySessionStore>,
    tokens: Arc<MemoryTokenStore>,
    mailer: Arc<RecordingMailer>,
    settings: AuthSettings,
) -> AuthService {
    let mut oauth: OAuthRegistry = HashMap::new();
    oauth.insert("google".into(), Arc::new(FakeOAuthProvider::default()));

    AuthService::new(
        AuthBackends {
            users,
            user_cache,
            sessions,
            tokens,
            oauth_states: Arc::new(MemoryOAuthStateCache::default()),
            mailer,
        },
        Sha256Hasher::new(TEST_PASSWORD_SALT),
        JwtTokenizer::new(TEST_JWT_KEY, Duration::from_secs(900)),
        oauth,
        settings,
    )
}

pub fn test_config() -> Config {
    let oauth = OAuthClientConfig {
        client_id: String::new(),
        secret: String::new(),
        redirect_url: String::new(),
    };
    let generous = RateLimitConfig {
        rps: 1000.0,
        burst: 1000,
        ttl: Duration::from_secs(60),
    };

    Config {
        app_url: "http://localhost:8080".into(),
        frontend_url: "http://localhost:3000".into(),
        server_host: "127.0.0.1".into(),
        server_port: 0,
        http_timeout: Duration::from_secs(5),
        cors_allowed_origins: Vec::new(),
        cors_max_age: Duration::from_secs(300),
        database_url: String::new(),
        database_max_connections: 1,
        redis_url: String::new(),
        nats_url: String::new(),
        mail_request_timeout: Duration::from_secs(1),
        jwt_signing_key: TEST_JWT_KEY.into(),
        jwt_access_token_ttl: Duration::from_secs(900),
        jwt_refresh_token_ttl: Duration::from_secs(3600),
        password_salt: TEST_PASSWORD_SALT.into(),
        note_password_salt: "test-note-salt".into(),
        min_password_length: 6,
        reserved_slugs: vec!["read".into(), "unread".into()],
        logout_on_password_change: false,
        cache_users_ttl: Duration::from_secs(60),
        cache_note_ttl: Duration::from_secs(60),
        verification_token_ttl: Duration::from_secs(3600),
        reset_password_token_ttl: Duration::from_secs(3600),
        change_email_token_ttl: Duration::from_secs(3600),
        google: oauth.clone(),
        github: oauth,
        rate_limit: generous,
        slow_rate_limit: generous,
        log_format: LogFormat::Text,
    }
}

/// 路由测试用的完整应用状态
pub struct TestApp {
    pub state: AppState,
    pub notes: Arc<MemoryNoteStore>,
    pub users: Arc<MemoryUserStore>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new(config: Config) -> Self {
        let notes = Arc::new(MemoryNoteStore::default());
        let users = Arc::new(MemoryUserStore::default());
        let mailer = Arc::new(RecordingMailer::default());

        let note_service = NoteService::new(
            notes.clone(),
            Arc::new(MemoryNoteCache::default()),
            Sha256Hasher::new(config.note_password_salt.clone()),
            config.reserved_slugs.clone(),
        );
        let auth_service = build_auth_service(
            users.clone(),
            Arc::new(MemoryUserCache::default()),
            Arc::new(MemorySessionStore::default()),
            Arc::new(MemoryTokenStore::new(users.clone())),
            mailer.clone(),
            AuthSettings::from_config(&config),
        );

        Self {
            state: AppState {
                config: Arc::new(config),
                notes: Arc::new(note_service),
                auth: Arc::new(auth_service),
            },
            notes,
            users,
            mailer,
        }
    }
}
