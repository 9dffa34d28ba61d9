//! Common error types for Walkthrough.

use thiserror::Error;

/// Result type alias using Walkthrough's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type shared by the Walkthrough crates.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file, asset read, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Format or feature the loader cannot handle
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a serialization error from any displayable type.
    pub fn serialization(msg: impl std::fmt::Display) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Create a config error from any displayable type.
    pub fn config(msg: impl std::fmt::Display) -> Self {
        Self::Config(msg.to_string())
    }

    /// Create a not found error from any displayable type.
    pub fn not_found(msg: impl std::fmt::Display) -> Self {
        Self::NotFound(msg.to_string())
    }

    /// Create an unsupported error from any displayable type.
    pub fn unsupported(msg: impl std::fmt::Display) -> Self {
        Self::Unsupported(msg.to_string())
    }

    /// Create an internal error from any displayable type.
    pub fn internal(msg: impl std::fmt::Display) -> Self {
        Self::Internal(msg.to_string())
    }
}
