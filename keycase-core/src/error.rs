//! Error types for keycase

use thiserror::Error;

/// keycase error types
#[derive(Debug, Error)]
pub enum KeycaseError {
    /// A reserved-key rule was configured with an unusable value.
    #[error("Invalid reserved-key rule: {0}")]
    InvalidReservedRule(String),
    /// An opaque handle cannot be represented as JSON.
    #[error("Opaque value '{0}' cannot be represented as JSON")]
    OpaqueValue(String),
    /// A configured input limit was exceeded.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    /// A single NDJSON record failed to parse.
    #[error("Invalid JSON record on line {line}: {source}")]
    InvalidRecord {
        /// 1-based input line number
        line: usize,
        /// Underlying parser error
        #[source]
        source: serde_json::Error,
    },
    /// Configuration is inconsistent or could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
    /// I/O operation failed while reading or writing data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, KeycaseError>;
