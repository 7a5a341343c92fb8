use axum::{
    extract::{Json, Path, Query, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};

use crate::{AppState, error::AppError};

use super::model::{AuthUrlResponse, CallbackQuery, RedirectQuery};

#[axum::debug_handler]
pub async fn oauth_redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<RedirectQuery>,
) -> Result<Response, AppError> {
    let url = state.auth.oauth_url(&provider).await?;

    if query.redirect == Some(false) {
        return Ok(Json(AuthUrlResponse { url }).into_response());
    }
    Ok((StatusCode::FOUND, [(LOCATION, url)]).into_response())
}

#[axum::debug_handler]
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, AppError> {
    if query.code.is_empty() || query.state.is_empty() {
        return Err(AppError::InvalidRequest);
    }

    let tokens = state
        .auth
        .oauth_callback(&provider, &query.code, &query.state)
        .await?;
    Ok(Json(tokens))
}
