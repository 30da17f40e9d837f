//! Error types for the train_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for train_core operations
///
/// The session state machine never produces these; they only surface at the
/// storage, configuration and export boundaries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage adapter failure (read, write, or background task)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A date key that is not `YYYY-MM-DD`
    #[error("Invalid date key: {0:?}")]
    InvalidDateKey(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    Catalog(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
