//! Error types for the hybrid_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for hybrid_core operations
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

    /// HTTP transport error (drive backup)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable store refused a write (quota, lock, serialization)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Snapshot import was rejected; the durable store is unchanged
    #[error("Import error: {0}")]
    Import(String),

    /// Operation not valid for the current session state
    #[error("State error: {0}")]
    State(String),

    /// Drive authorization did not produce a credential
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Drive upload was rejected
    #[error("Upload error: {0}")]
    Upload(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
