//! External collaborators

pub mod media;

pub use media::{LocalMediaStore, MediaStore};
