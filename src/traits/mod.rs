mod cache;
mod store;

pub use cache::{NoteCache, NoteMetadata, OAuthStateCache, UserCache};
pub use store::{NoteStore, SessionStore, TokenStore, UserStore};
