//! Error types for the ETL pipeline
//!
//! One tagged-union error type carries the failure kind and context; the
//! audit-log boundary renders it uniformly into status tags instead of each
//! call site formatting its own message.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Pipeline error type
#[derive(Error, Debug)]
pub enum EtlError {
    /// SQL query or connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP request failed at the transport level
    #[error("Network request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// File system operation failed
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables.")]
    Config(String),

    /// Country name does not resolve in the country directory
    #[error("Country '{0}' not found")]
    CountryNotFound(String),

    /// Error from the shared workspace crate
    #[error(transparent)]
    Common(#[from] pulse_common::PulseError),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EtlError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
