use axum::{
    body::Bytes,
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    database::models::note::NoteFilter,
    error::AppError,
    middleware::{AuthUser, MaybeAuthUser},
    routes::{ApiJson, optional_json},
};

use super::model::{
    CreateNoteRequest, CreateNoteResponse, NoteMetadataResponse, NoteResponse, NoteSummary,
    ReadNoteRequest, SetPasswordRequest, UpdateExpirationRequest,
};

#[axum::debug_handler]
pub async fn create_note(
    State(state): State<AppState>,
    Extension(MaybeAuthUser(author)): Extension<MaybeAuthUser>,
    ApiJson(req): ApiJson<CreateNoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let slug = state.notes.create(req.into(), author).await?;
    Ok((StatusCode::CREATED, Json(CreateNoteResponse { slug })))
}

/// GET 与 POST /view 共用；请求体可省略
#[axum::debug_handler]
pub async fn read_note(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let req: ReadNoteRequest = optional_json(&body)?;

    let view = state.notes.read(&slug, req.password.as_deref()).await?;
    Ok(Json(NoteResponse::from(view)))
}

#[axum::debug_handler]
pub async fn note_metadata(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let metadata = state.notes.get_metadata(&slug).await?;
    Ok(Json(NoteMetadataResponse::from(metadata)))
}

#[axum::debug_handler]
pub async fn delete_note(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.notes.delete(&slug, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn update_expiration(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(slug): Path<String>,
    ApiJson(req): ApiJson<UpdateExpirationRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .notes
        .update_expiration(&slug, user_id, req.into())
        .await?;
    Ok(StatusCode::OK)
}

#[axum::debug_handler]
pub async fn set_password(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(slug): Path<String>,
    ApiJson(req): ApiJson<SetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .notes
        .set_password(&slug, user_id, &req.password)
        .await?;
    Ok(StatusCode::OK)
}

async fn list(
    state: &AppState,
    user_id: uuid::Uuid,
    filter: NoteFilter,
) -> Result<Json<Vec<NoteSummary>>, AppError> {
    let notes = state.notes.list_by_author(user_id, filter).await?;
    Ok(Json(notes.into_iter().map(NoteSummary::from).collect()))
}

#[axum::debug_handler]
pub async fn list_notes(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    list(&state, user_id, NoteFilter::All).await
}

#[axum::debug_handler]
pub async fn list_read_notes(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    list(&state, user_id, NoteFilter::Read).await
}

#[axum::debug_handler]
pub async fn list_unread_notes(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    list(&state, user_id, NoteFilter::Unread).await
}
