use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::traits::NoteMetadata;

/// 缓存中的笔记元数据，时间存为秒级时间戳
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedNoteMetadata {
    pub created_at: i64,
    pub has_password: bool,
}

impl From<&NoteMetadata> for CachedNoteMetadata {
    fn from(metadata: &NoteMetadata) -> Self {
        Self {
            created_at: metadata.created_at.timestamp(),
            has_password: metadata.has_password,
        }
    }
}

impl CachedNoteMetadata {
    pub fn into_metadata(self) -> Option<NoteMetadata> {
        Some(NoteMetadata {
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0)?,
            has_password: self.has_password,
        })
    }
}
