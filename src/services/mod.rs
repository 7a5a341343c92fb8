pub mod auth;
pub mod note;

pub use auth::{AuthBackends, AuthService, AuthSettings, TokenPair};
pub use note::{CreateNoteInput, NoteService, NoteView, UpdateExpirationInput};
