//! Error types for facet-db-core

use thiserror::Error;

/// Result type alias using our error
pub type Result<T> = std::result::Result<T, SelectionError>;

/// Selection cache error type
#[derive(Error, Debug)]
pub enum SelectionError {
    /// I/O error (swap file, config file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error from the verbose or paged wire forms
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed persisted or wire input
    #[error("decode error: {0}")]
    Decode(String),

    /// The container is swapped out and could not be restored.
    #[error("selection list {id} unavailable: {reason}")]
    Unavailable { id: u64, reason: String },

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl SelectionError {
    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        SelectionError::Decode(msg.into())
    }

    /// Create an unavailable error for the given list
    pub fn unavailable(id: u64, reason: impl Into<String>) -> Self {
        SelectionError::Unavailable {
            id,
            reason: reason.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        SelectionError::Config(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        SelectionError::Other(msg.into())
    }

    /// True when the error means "swapped out and not restorable right now".
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SelectionError::Unavailable { .. })
    }
}
