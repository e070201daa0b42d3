//! Personal note-taking library
//!
//! This library keeps a collection of short notes with formatting hints,
//! categories, tags and one-shot reminders. The collection is persisted as a
//! single blob and exposes filtered views for a front end to render.

mod cli;
mod config;
mod errors;
mod helper;
mod note;
mod notebook;
mod reminders;
mod storage;
mod store;
mod types;

// Re-export key components
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use helper::*;
pub use note::*;
pub use notebook::*;
pub use reminders::*;
pub use storage::*;
pub use store::*;
pub use types::*;
