mod auth;
mod error_handler;
mod rate_limit;
mod request_id;

pub use auth::{AuthUser, MaybeAuthUser, maybe_auth, require_auth};
pub use error_handler::log_errors;
pub use rate_limit::{RateLimiter, client_ip, rate_limit};
pub use request_id::{REQUEST_ID_HEADER, current_request_id, request_id};
