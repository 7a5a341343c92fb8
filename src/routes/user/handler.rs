use axum::{
    extract::{Extension, Json, State},
    response::IntoResponse,
};

use crate::{AppState, error::AppError, middleware::AuthUser};

use super::model::MeResponse;

#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.get_user(user_id).await?;
    let notes_created = state.notes.count_by_author(user_id).await?;

    Ok(Json(MeResponse {
        email: user.email,
        created_at: user.created_at,
        last_login_at: user.last_login_at,
        notes_created,
    }))
}
