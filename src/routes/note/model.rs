use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::services::{CreateNoteInput, NoteView, UpdateExpirationInput};
use crate::traits::NoteMetadata;

/// 接受 null、0、Unix 秒、RFC3339 字符串；0 与零值时间表示不过期
pub fn deserialize_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None | Some(Raw::Seconds(0)) => Ok(None),
        Some(Raw::Seconds(secs)) => DateTime::<Utc>::from_timestamp(secs, 0)
            .map(Some)
            .ok_or_else(|| de::Error::custom("timestamp out of range")),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Raw::Text(text)) => {
            let parsed = DateTime::parse_from_rfc3339(text.trim())
                .map_err(de::Error::custom)?
                .with_timezone(&Utc);
            if parsed.year() <= 1 {
                Ok(None)
            } else {
                Ok(Some(parsed))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub content: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub burn_before_expiration: bool,
    #[serde(default, deserialize_with = "deserialize_instant")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<CreateNoteRequest> for CreateNoteInput {
    fn from(req: CreateNoteRequest) -> Self {
        CreateNoteInput {
            content: req.content,
            slug: req.slug,
            password: req.password,
            burn_before_expiration: req.burn_before_expiration,
            expires_at: req.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateNoteResponse {
    pub slug: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReadNoteRequest {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub content: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub keep_before_expiration: bool,
}

impl From<NoteView> for NoteResponse {
    fn from(view: NoteView) -> Self {
        NoteResponse {
            content: view.content,
            read_at: view.read_at,
            created_at: view.created_at,
            expires_at: view.expires_at,
            keep_before_expiration: !view.burn_before_expiration,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NoteMetadataResponse {
    pub created_at: DateTime<Utc>,
    pub has_password: bool,
}

impl From<NoteMetadata> for NoteMetadataResponse {
    fn from(metadata: NoteMetadata) -> Self {
        NoteMetadataResponse {
            created_at: metadata.created_at,
            has_password: metadata.has_password,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateExpirationRequest {
    #[serde(default, deserialize_with = "deserialize_instant")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub burn_before_expiration: Option<bool>,
}

impl From<UpdateExpirationRequest> for UpdateExpirationInput {
    fn from(req: UpdateExpirationRequest) -> Self {
        UpdateExpirationInput {
            expires_at: req.expires_at,
            burn_before_expiration: req.burn_before_expiration,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    #[serde(default)]
    pub password: String,
}

/// 列表项，不包含内容
#[derive(Debug, Serialize)]
pub struct NoteSummary {
    pub slug: String,
    pub has_password: bool,
    pub burn_before_expiration: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<NoteView> for NoteSummary {
    fn from(view: NoteView) -> Self {
        NoteSummary {
            slug: view.slug,
            has_password: view.has_password,
            burn_before_expiration: view.burn_before_expiration,
            read_at: view.read_at,
            created_at: view.created_at,
            expires_at: view.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expires(json: &str) -> Option<DateTime<Utc>> {
        serde_json::from_str::<CreateNoteRequest>(json)
            .unwrap()
            .expires_at
    }

    #[test]
    fn zero_and_missing_mean_never() {
        assert_eq!(expires(r#"{"content":"c"}"#), None);
        assert_eq!(expires(r#"{"content":"c","expires_at":null}"#), None);
        assert_eq!(expires(r#"{"content":"c","expires_at":0}"#), None);
        assert_eq!(expires(r#"{"content":"c","expires_at":""}"#), None);
        assert_eq!(
            expires(r#"{"content":"c","expires_at":"0001-01-01T00:00:00Z"}"#),
            None
        );
    }

    #[test]
    fn accepts_unix_seconds_and_rfc3339() {
        let at = DateTime::<Utc>::from_timestamp(1_900_000_000, 0);
        assert_eq!(expires(r#"{"content":"c","expires_at":1900000000}"#), at);
        assert_eq!(
            expires(r#"{"content":"c","expires_at":"2030-03-17T17:46:40Z"}"#),
            at
        );
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(
            serde_json::from_str::<CreateNoteRequest>(r#"{"content":"c","expires_at":"soon"}"#)
                .is_err()
        );
    }
}
