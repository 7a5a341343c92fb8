use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // 笔记
    #[error("note: content is empty")]
    NoteContentEmpty,
    #[error("note: slug is invalid")]
    NoteSlugInvalid,
    #[error("note: slug is reserved")]
    NoteSlugReserved,
    #[error("note: slug is already in use")]
    NoteSlugInUse,
    #[error("note: expired")]
    NoteExpired,
    #[error("note: cannot be burnt before expiration if expiration time is not provided")]
    NoteCannotBurnWithoutExpiry,
    #[error("note: not found")]
    NoteNotFound,
    #[error("note: not owner")]
    NoteNotOwner,

    // 用户与会话
    #[error("user: invalid email")]
    InvalidEmail,
    #[error("user: invalid password")]
    InvalidPassword,
    #[error("user: email is already in use")]
    EmailInUse,
    #[error("user: wrong credentials")]
    WrongCredentials,
    #[error("user: is not activated")]
    NotActivated,
    #[error("user: already activated")]
    AlreadyActivated,
    #[error("user: not found")]
    UserNotFound,
    #[error("user: session not found")]
    SessionNotFound,

    // 一次性令牌
    #[error("token: not found")]
    TokenNotFound,
    #[error("token: expired")]
    TokenExpired,
    #[error("token: already used")]
    TokenAlreadyUsed,

    #[error("oauth: provider is not supported")]
    OAuthProviderNotSupported,
    #[error("oauth: email is not verified")]
    OAuthEmailUnverified,
    #[error("oauth: invalid state")]
    OAuthInvalidState,

    #[error("mail: dispatch failed")]
    MailDispatchFailed(String),

    #[error("unauthorized")]
    Unauthorized,
    #[error("rate limited")]
    RateLimited,
    #[error("invalid request")]
    InvalidRequest,

    #[error("internal error")]
    Database(#[from] sqlx::Error),
    #[error("internal error")]
    Cache(#[from] redis::RedisError),
    #[error("internal error")]
    Internal(String),
}

impl AppError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        AppError::Internal(err.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NoteContentEmpty
            | AppError::NoteSlugInvalid
            | AppError::NoteSlugReserved
            | AppError::NoteSlugInUse
            | AppError::NoteCannotBurnWithoutExpiry
            | AppError::InvalidEmail
            | AppError::InvalidPassword
            | AppError::EmailInUse
            | AppError::AlreadyActivated
            | AppError::TokenExpired
            | AppError::TokenAlreadyUsed
            | AppError::OAuthProviderNotSupported
            | AppError::OAuthEmailUnverified
            | AppError::OAuthInvalidState
            | AppError::InvalidRequest => StatusCode::BAD_REQUEST,

            AppError::WrongCredentials | AppError::SessionNotFound | AppError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }

            AppError::NoteNotOwner | AppError::NotActivated => StatusCode::FORBIDDEN,

            AppError::NoteNotFound
            | AppError::NoteExpired
            | AppError::UserNotFound
            | AppError::TokenNotFound => StatusCode::NOT_FOUND,

            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::MailDispatchFailed(_) => StatusCode::SERVICE_UNAVAILABLE,

            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::Database(e) => tracing::error!(error = %e, "database error"),
            AppError::Cache(e) => tracing::error!(error = %e, "cache error"),
            AppError::Internal(e) => tracing::error!(error = %e, "internal error"),
            AppError::MailDispatchFailed(reason) => {
                tracing::error!(reason = %reason, "mail dispatch failed")
            }
            _ => {}
        }

        let body = Json(ErrorResponse {
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), reason = %rejection.body_text(), "rejected request body");
        AppError::InvalidRequest
    }
}

pub type AppResult<T> = Result<T, AppError>;
