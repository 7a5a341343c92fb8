use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;

/// 已认证用户
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

/// 可选认证，匿名请求为 None
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaybeAuthUser(pub Option<Uuid>);

async fn authenticate(state: &AppState, token: &str) -> Result<Uuid, AppError> {
    let user_id = state
        .auth
        .parse_access_token(token)
        .ok_or(AppError::Unauthorized)?;

    // 令牌有效但用户已被删除
    if !state.auth.check_if_user_exists(user_id).await? {
        return Err(AppError::Unauthorized);
    }
    Ok(user_id)
}

pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::Unauthorized)?;
    let user_id = authenticate(&state, bearer.token()).await?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}

/// 携带了令牌就必须有效
pub async fn maybe_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = match bearer {
        Some(TypedHeader(Authorization(bearer))) => {
            Some(authenticate(&state, bearer.token()).await?)
        }
        None => None,
    };

    req.extensions_mut().insert(MaybeAuthUser(user_id));
    Ok(next.run(req).await)
}
