use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::is_unique_violation;
use crate::database::models::note::{NewNote, NoteEntity, NoteFilter};
use crate::error::AppError;
use crate::traits::NoteStore;

const NOTE_COLUMNS: &str =
    "n.id, n.content, n.slug, n.password, n.burn_before_expiration, n.read_at, n.created_at, n.expires_at";

/// 笔记存储库实现
#[derive(Clone)]
pub struct NoteRepository {
    pool: PgPool,
}

impl NoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteStore for NoteRepository {
    async fn create(&self, note: NewNote, author: Option<Uuid>) -> Result<NoteEntity, AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, NoteEntity>(
            r#"
            INSERT INTO notes (content, slug, password, burn_before_expiration, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, content, slug, password, burn_before_expiration, read_at, created_at, expires_at
            "#,
        )
        .bind(&note.content)
        .bind(&note.slug)
        .bind(&note.password)
        .bind(note.burn_before_expiration)
        .bind(note.created_at)
        .bind(note.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "notes_slug_key") {
                AppError::NoteSlugInUse
            } else {
                AppError::Database(e)
            }
        })?;

        if let Some(user_id) = author {
            sqlx::query("INSERT INTO notes_authors (note_id, user_id) VALUES ($1, $2)")
                .bind(inserted.id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(inserted)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<NoteEntity>, AppError> {
        let note = sqlx::query_as::<_, NoteEntity>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes n WHERE n.slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(note)
    }

    async fn burn(&self, id: Uuid) -> Result<Option<String>, AppError> {
        let content: Option<String> = sqlx::query_scalar(
            "DELETE FROM notes WHERE id = $1 AND read_at IS NULL RETURNING content",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(content)
    }

    async fn mark_read(
        &self,
        id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<Option<String>, AppError> {
        // 子查询加行锁，RETURNING 拿到更新前的内容
        let content: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE notes n
            SET content = '', read_at = $2
            FROM (SELECT id, content FROM notes WHERE id = $1 AND read_at IS NULL FOR UPDATE) old
            WHERE n.id = old.id
            RETURNING old.content
            "#,
        )
        .bind(id)
        .bind(read_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(content)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn is_author(&self, id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM notes_authors WHERE note_id = $1 AND user_id = $2)",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(owned)
    }

    async fn update_expiration(
        &self,
        id: Uuid,
        expires_at: Option<DateTime<Utc>>,
        burn_before_expiration: bool,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE notes SET expires_at = $2, burn_before_expiration = $3 WHERE id = $1")
            .bind(id)
            .bind(expires_at)
            .bind(burn_before_expiration)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE notes SET password = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_by_author(
        &self,
        user_id: Uuid,
        filter: NoteFilter,
    ) -> Result<Vec<NoteEntity>, AppError> {
        let read_clause = match filter {
            NoteFilter::All => "",
            NoteFilter::Read => " AND n.read_at IS NOT NULL",
            NoteFilter::Unread => " AND n.read_at IS NULL",
        };

        let notes = sqlx::query_as::<_, NoteEntity>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes n \
             JOIN notes_authors a ON a.note_id = n.id \
             WHERE a.user_id = $1{read_clause} \
             ORDER BY n.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notes)
    }

    async fn count_by_author(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes_authors WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
