mod handler;
mod model;

pub use handler::{
    create_note, delete_note, list_notes, list_read_notes, list_unread_notes, note_metadata,
    read_note, set_password, update_expiration,
};
