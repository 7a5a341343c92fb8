use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::models::note::{NewNote, NoteEntity, NoteFilter};
use crate::error::AppError;
use crate::traits::{NoteCache, NoteMetadata, NoteStore};
use crate::utils::Sha256Hasher;

const MAX_SLUG_LEN: usize = 255;

/// 与 `/note/` 下固定路由冲突的 slug，无论配置如何都保留
pub const ROUTE_SEGMENTS: &[&str] = &["read", "unread"];

#[derive(Debug, Clone, Default)]
pub struct CreateNoteInput {
    pub content: String,
    pub slug: Option<String>,
    pub password: Option<String>,
    pub burn_before_expiration: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateExpirationInput {
    pub expires_at: Option<DateTime<Utc>>,
    pub burn_before_expiration: Option<bool>,
}

/// 读取结果；已读笔记的 content 为空
#[derive(Debug, Clone, PartialEq)]
pub struct NoteView {
    pub content: String,
    pub slug: String,
    pub burn_before_expiration: bool,
    pub has_password: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NoteView {
    fn from_entity(note: &NoteEntity, content: String) -> Self {
        Self {
            content,
            slug: note.slug.clone(),
            burn_before_expiration: note.burn_before_expiration,
            has_password: note.has_password(),
            read_at: note.read_at,
            created_at: note.created_at,
            expires_at: note.expires_at,
        }
    }
}

/// 笔记生命周期：创建、一次性读取、作者管理
pub struct NoteService {
    store: Arc<dyn NoteStore>,
    cache: Arc<dyn NoteCache>,
    hasher: Sha256Hasher,
    reserved_slugs: HashSet<String>,
}

impl NoteService {
    pub fn new(
        store: Arc<dyn NoteStore>,
        cache: Arc<dyn NoteCache>,
        hasher: Sha256Hasher,
        reserved_slugs: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            store,
            cache,
            hasher,
            reserved_slugs: reserved_slugs
                .into_iter()
                .chain(ROUTE_SEGMENTS.iter().map(|s| s.to_string()))
                .collect(),
        }
    }

    pub async fn create(
        &self,
        input: CreateNoteInput,
        author: Option<Uuid>,
    ) -> Result<String, AppError> {
        let now = Utc::now();

        if input.content.is_empty() {
            return Err(AppError::NoteContentEmpty);
        }

        let slug = match input.slug.as_deref() {
            Some(slug) if !slug.is_empty() => {
                if !is_valid_slug(slug) {
                    return Err(AppError::NoteSlugInvalid);
                }
                if self.reserved_slugs.contains(slug) {
                    return Err(AppError::NoteSlugReserved);
                }
                slug.to_string()
            }
            _ => Uuid::new_v4().to_string(),
        };

        validate_expiration(input.expires_at, input.burn_before_expiration, now)?;

        let password = match input.password.as_deref() {
            Some(p) if !p.is_empty() => self.hasher.hash(p),
            _ => String::new(),
        };

        let note = self
            .store
            .create(
                NewNote {
                    content: input.content,
                    slug,
                    password,
                    burn_before_expiration: input.burn_before_expiration,
                    created_at: now,
                    expires_at: input.expires_at,
                },
                author,
            )
            .await?;

        self.invalidate_metadata(&note.slug).await;
        tracing::info!(slug = %note.slug, authored = author.is_some(), "note created");

        Ok(note.slug)
    }

    /// 一次性读取，内容至多交付一次
    pub async fn read(&self, slug: &str, password: Option<&str>) -> Result<NoteView, AppError> {
        let now = Utc::now();

        let note = self
            .store
            .get_by_slug(slug)
            .await?
            .ok_or(AppError::NoteNotFound)?;

        if note.is_expired_at(now) {
            if note.burn_before_expiration {
                self.store.delete(note.id).await?;
                self.invalidate_metadata(&note.slug).await;
                tracing::debug!(slug = %note.slug, "expired note removed on read");
            }
            return Err(AppError::NoteExpired);
        }

        if note.has_password() {
            match password {
                Some(p) if !p.is_empty() && self.hasher.compare(&note.password, p) => {}
                _ => return Err(AppError::NoteNotFound),
            }
        }

        if note.is_read() {
            return Ok(NoteView::from_entity(&note, String::new()));
        }

        if note.burns_on_read() {
            let content = self
                .store
                .burn(note.id)
                .await?
                .ok_or(AppError::NoteNotFound)?;
            self.invalidate_metadata(&note.slug).await;
            tracing::info!(slug = %note.slug, "note burnt");
            return Ok(NoteView::from_entity(&note, content));
        }

        match self.store.mark_read(note.id, now).await? {
            // 首次读取返回本次写入的 read_at，与之后的空白读取一致
            Some(content) => {
                tracing::info!(slug = %note.slug, "note read, kept until expiration");
                Ok(NoteView {
                    read_at: Some(now),
                    ..NoteView::from_entity(&note, content)
                })
            }
            // 并发读取中落败，返回已清空的笔记
            None => {
                let current = self
                    .store
                    .get_by_slug(slug)
                    .await?
                    .ok_or(AppError::NoteNotFound)?;
                Ok(NoteView::from_entity(&current, String::new()))
            }
        }
    }

    pub async fn get_metadata(&self, slug: &str) -> Result<NoteMetadata, AppError> {
        match self.cache.get(slug).await {
            Ok(Some(metadata)) => return Ok(metadata),
            Ok(None) => {}
            Err(e) => tracing::warn!(slug = %slug, error = ?e, "note cache read failed"),
        }

        let note = self
            .store
            .get_by_slug(slug)
            .await?
            .ok_or(AppError::NoteNotFound)?;

        let metadata = NoteMetadata {
            created_at: note.created_at,
            has_password: note.has_password(),
        };

        if let Err(e) = self.cache.set(slug, &metadata).await {
            tracing::warn!(slug = %slug, error = ?e, "note cache write failed");
        }

        Ok(metadata)
    }

    pub async fn delete(&self, slug: &str, user_id: Uuid) -> Result<(), AppError> {
        let note = self.owned_note(slug, user_id).await?;
        self.store.delete(note.id).await?;
        self.invalidate_metadata(slug).await;
        tracing::info!(slug = %slug, "note deleted by author");
        Ok(())
    }

    pub async fn update_expiration(
        &self,
        slug: &str,
        user_id: Uuid,
        input: UpdateExpirationInput,
    ) -> Result<(), AppError> {
        let note = self.owned_note(slug, user_id).await?;

        let expires_at = input.expires_at.or(note.expires_at);
        let burn = input
            .burn_before_expiration
            .unwrap_or(note.burn_before_expiration);

        // 只校验本次提供的到期时间，原有值允许已过期
        validate_expiration(input.expires_at, burn && expires_at.is_none(), Utc::now())?;

        self.store
            .update_expiration(note.id, expires_at, burn)
            .await?;
        Ok(())
    }

    pub async fn set_password(
        &self,
        slug: &str,
        user_id: Uuid,
        password: &str,
    ) -> Result<(), AppError> {
        let note = self.owned_note(slug, user_id).await?;

        let hash = if password.is_empty() {
            String::new()
        } else {
            self.hasher.hash(password)
        };

        self.store.set_password(note.id, &hash).await?;
        self.invalidate_metadata(slug).await;
        Ok(())
    }

    pub async fn list_by_author(
        &self,
        user_id: Uuid,
        filter: NoteFilter,
    ) -> Result<Vec<NoteView>, AppError> {
        let notes = self.store.list_by_author(user_id, filter).await?;
        Ok(notes
            .iter()
            .map(|n| NoteView::from_entity(n, String::new()))
            .collect())
    }

    pub async fn count_by_author(&self, user_id: Uuid) -> Result<i64, AppError> {
        self.store.count_by_author(user_id).await
    }

    async fn owned_note(&self, slug: &str, user_id: Uuid) -> Result<NoteEntity, AppError> {
        let note = self
            .store
            .get_by_slug(slug)
            .await?
            .ok_or(AppError::NoteNotFound)?;

        if !self.store.is_author(note.id, user_id).await? {
            return Err(AppError::NoteNotOwner);
        }
        Ok(note)
    }

    async fn invalidate_metadata(&self, slug: &str) {
        if let Err(e) = self.cache.invalidate(slug).await {
            tracing::warn!(slug = %slug, error = ?e, "note cache invalidation failed");
        }
    }
}

/// `[A-Za-z0-9_-]{1,255}`
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// 到期时间不能早于当前时刻；要求焚毁时必须有到期时间
fn validate_expiration(
    expires_at: Option<DateTime<Utc>>,
    requires_expiry: bool,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if matches!(expires_at, Some(at) if at <= now) {
        return Err(AppError::NoteExpired);
    }
    if requires_expiry && expires_at.is_none() {
        return Err(AppError::NoteCannotBurnWithoutExpiry);
    }
    Ok(())
}
