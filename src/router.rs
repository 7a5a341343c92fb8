use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post},
};
use tokio::task::JoinHandle;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    AppState,
    config::Config,
    middleware::{
        REQUEST_ID_HEADER, RateLimiter, log_errors, maybe_auth, rate_limit, request_id,
        require_auth,
    },
    routes::{self, auth, note, oauth, user},
};

/// 默认档位作用于全部请求，慢速档位只用于登录、重发验证邮件与找回密码
pub struct RateLimiters {
    pub default: Arc<RateLimiter>,
    pub slow: Arc<RateLimiter>,
}

impl RateLimiters {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default: Arc::new(RateLimiter::new("default", config.rate_limit)),
            slow: Arc::new(RateLimiter::new("slow", config.slow_rate_limit)),
        }
    }

    pub fn spawn_sweepers(&self) -> Vec<JoinHandle<()>> {
        vec![self.default.spawn_sweeper(), self.slow.spawn_sweeper()]
    }
}

fn api_routes(state: &AppState, limiters: &RateLimiters) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/refresh-tokens", post(auth::refresh_tokens))
        .route("/auth/verify/{token}", get(auth::verify))
        .route("/auth/reset-password/{token}", post(auth::reset_password))
        .route("/auth/change-email/{token}", get(auth::confirm_email_change))
        .route("/oauth/{provider}", get(oauth::oauth_redirect))
        .route("/oauth/{provider}/callback", get(oauth::oauth_callback))
        .route("/note/{slug}/metadata", get(note::note_metadata));

    let slow = Router::new()
        .route("/auth/signin", post(auth::signin))
        .route(
            "/auth/resend-verification-email",
            post(auth::resend_verification_email),
        )
        .route(
            "/auth/request-reset-password",
            post(auth::request_reset_password),
        )
        .route_layer(from_fn_with_state(limiters.slow.clone(), rate_limit));

    // 匿名可用，带令牌时识别作者
    let optional = Router::new()
        .route("/note", post(note::create_note))
        .route("/note/{slug}", get(note::read_note))
        .route("/note/{slug}/view", post(note::read_note))
        .route_layer(from_fn_with_state(state.clone(), maybe_auth));

    let protected = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/logout/all", post(auth::logout_all))
        .route("/auth/change-password", post(auth::change_password))
        .route("/auth/change-email", post(auth::request_email_change))
        .route("/note", get(note::list_notes))
        .route("/note/read", get(note::list_read_notes))
        .route("/note/unread", get(note::list_unread_notes))
        .route("/note/{slug}", delete(note::delete_note))
        .route("/note/{slug}/expires", patch(note::update_expiration))
        .route("/note/{slug}/password", patch(note::set_password))
        .route("/me", get(user::me))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(slow)
        .merge(optional)
        .merge(protected)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let allow_origin = if config.cors_allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins = config
            .cors_allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect::<Vec<_>>();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, request_id.clone()])
        .expose_headers([request_id])
        .max_age(config.cors_max_age)
}

// 创建主路由
pub fn create_router(state: AppState, limiters: &RateLimiters) -> Router {
    let config = state.config.clone();

    Router::new()
        .route("/api/ping", get(routes::ping))
        .nest("/api/v1", api_routes(&state, limiters))
        .layer(TimeoutLayer::new(config.http_timeout))
        .layer(from_fn_with_state(limiters.default.clone(), rate_limit))
        .layer(from_fn(log_errors))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config))
        .layer(from_fn(request_id))
        .with_state(state)
}
