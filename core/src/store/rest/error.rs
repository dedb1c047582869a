//! Error types for the REST store backend.

use thiserror::Error;

/// REST backend error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with a non-success status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Client could not be constructed from the given configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
