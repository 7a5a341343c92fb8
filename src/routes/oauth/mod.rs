mod handler;
mod model;

pub use handler::{oauth_callback, oauth_redirect};
