mod handler;
mod model;

pub use handler::{
    change_password, confirm_email_change, logout, logout_all, refresh_tokens,
    request_email_change, request_reset_password, resend_verification_email, reset_password,
    signin, signup, verify,
};
