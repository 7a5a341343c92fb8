pub mod auth;
pub mod note;
pub mod oauth;
pub mod user;

use axum::{Json, body::Bytes, extract::FromRequest, response::IntoResponse};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::AppError;

pub async fn ping() -> impl IntoResponse {
    Json(json!({ "message": "pong" }))
}

/// JSON 请求体，解析失败统一返回 `invalid request`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// 请求体可省略的 JSON，空白视为默认值
pub(crate) fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|_| AppError::InvalidRequest)
}
