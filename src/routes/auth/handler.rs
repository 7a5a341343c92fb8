use axum::{
    body::Bytes,
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    error::AppError,
    middleware::AuthUser,
    routes::{ApiJson, optional_json},
};

use super::model::{
    ChangeEmailRequest, ChangePasswordRequest, CredentialsRequest, LogoutRequest, RefreshTokenRequest,
    RequestResetPasswordRequest, ResetPasswordRequest,
};

#[axum::debug_handler]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.sign_up(&req.email, &req.password).await?;
    Ok(StatusCode::CREATED)
}

#[axum::debug_handler]
pub async fn signin(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tokens = state.auth.sign_in(&req.email, &req.password).await?;
    Ok(Json(tokens))
}

#[axum::debug_handler]
pub async fn refresh_tokens(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tokens = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(tokens))
}

#[axum::debug_handler]
pub async fn verify(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.verify(&token).await?;
    Ok(StatusCode::OK)
}

#[axum::debug_handler]
pub async fn resend_verification_email(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth
        .resend_verification(&req.email, &req.password)
        .await?;
    Ok(StatusCode::OK)
}

/// 带 refresh_token 时只注销对应会话，否则注销全部会话
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let req: LogoutRequest = optional_json(&body)?;
    match req.refresh_token.as_deref() {
        Some(token) if !token.is_empty() => state.auth.logout(user_id, token).await?,
        _ => state.auth.logout_all(user_id).await?,
    }
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn logout_all(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.logout_all(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth
        .change_password(user_id, &req.current_password, &req.new_password)
        .await?;
    Ok(StatusCode::OK)
}

/// 用户是否存在都返回 200
#[axum::debug_handler]
pub async fn request_reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RequestResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.request_reset_password(&req.email).await?;
    Ok(StatusCode::OK)
}

#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.reset_password(&token, &req.password).await?;
    Ok(StatusCode::OK)
}

#[axum::debug_handler]
pub async fn request_email_change(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    ApiJson(req): ApiJson<ChangeEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth
        .request_email_change(user_id, &req.new_email)
        .await?;
    Ok(StatusCode::OK)
}

#[axum::debug_handler]
pub async fn confirm_email_change(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.confirm_email_change(&token).await?;
    Ok(StatusCode::OK)
}
