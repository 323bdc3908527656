//! Error types for the newsdigest core library.

use thiserror::Error;

/// Top-level error type for configuration, curation and storage.
#[derive(Error, Debug)]
pub enum DigestError {
    /// Configuration is unreadable or violates a constraint.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No entry survived de-duplication, truncation and field filtering.
    #[error("No usable entries: {received} received, {discarded} discarded")]
    EmptyResult {
        /// Entries the model returned.
        received: usize,
        /// Entries dropped for missing mandatory fields.
        discarded: usize,
    },

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, DigestError>;
