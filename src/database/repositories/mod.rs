pub mod note;
pub mod session;
pub mod token;
pub mod user;

pub use note::NoteRepository;
pub use session::SessionRepository;
pub use token::TokenRepository;
pub use user::UserRepository;
