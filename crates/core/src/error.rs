//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid {field}: {reason}")]
    InvalidSegment { field: &'static str, reason: String },

    #[error("invalid artifact path: {0}")]
    InvalidPath(String),

    #[error("incomplete upload payload: {0}")]
    Builder(&'static str),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
