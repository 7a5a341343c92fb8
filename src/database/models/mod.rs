pub mod note;
pub mod session;
pub mod token;
pub mod user;
