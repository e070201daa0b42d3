//! Error types for the notas application.
//!
//! This module defines custom error types that categorize different failures
//! that can occur while managing notes, their persistence and their reminders.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The main error type for the notas application.
#[derive(Error, Debug)]
pub enum NotasError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Note was not found when performing an operation.
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// A short id prefix matched more than one note.
    #[error("Ambiguous note id '{prefix}' matches {matches} notes")]
    AmbiguousId { prefix: String, matches: usize },

    /// Invalid note format or content.
    #[error("Invalid note format: {message}")]
    InvalidFormat { message: String },

    /// A date or time given by the user could not be understood.
    #[error("Invalid date '{input}': expected {expected}")]
    InvalidDate { input: String, expected: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// The reminder scheduler could not arm or cancel an alert.
    #[error("Reminder scheduling failed: {message}")]
    SchedulerError { message: String },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },
}
