//! Error types for the decomposer.

use thiserror::Error;

/// Main error type for the MIME library.
#[derive(Debug, Error)]
pub enum MimeError {
    /// The message has no bytes at all.
    #[error("Message is empty")]
    EmptyMessage,

    /// The message does not start with a header section.
    #[error("Malformed header at line {line}: '{text}'. Expected 'Name: value'")]
    MalformedHeader { line: usize, text: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, MimeError>;
