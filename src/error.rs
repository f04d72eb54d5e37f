//! Error types for the operation-log interceptor
//!
//! None of these ever reach the HTTP caller. They are produced inside the
//! detached logging task and reported through `tracing`.

use thiserror::Error;

/// Main error type for operation-log delivery
#[derive(Error, Debug)]
pub enum LogError {
    /// Collector configuration is missing (URL or API key)
    #[error("Missing configuration: collector URL or API key not provided")]
    MissingConfig,

    /// Network-related errors (connection, DNS, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Collector answered with a non-success status code
    #[error("Failed to send log: HTTP {0}")]
    SendFailed(reqwest::StatusCode),

    /// JSON serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Override value cannot be carried in a header (control characters)
    #[error("Invalid log field value: {0}")]
    InvalidField(#[from] actix_web::http::header::InvalidHeaderValue),

    /// A custom sink rejected the record
    #[error("Sink error: {0}")]
    Sink(String),

    /// Generic error for unexpected failures
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl LogError {
    /// Create a generic error from any message
    pub fn from_string(msg: impl Into<String>) -> Self {
        LogError::Other(msg.into())
    }

    /// Create a sink rejection error
    pub fn sink(msg: impl Into<String>) -> Self {
        LogError::Sink(msg.into())
    }
}
