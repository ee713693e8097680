//! Error types for holoviz-insights

use thiserror::Error;

/// Result type alias for insights operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for insights operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected key missing from an input dataset
    #[error("Missing required field '{0}' in dataset")]
    MissingField(String),

    /// Dataset has an unexpected shape
    #[error("Invalid dataset: {0}")]
    InvalidData(String),

    /// Arrow record batch error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet writer error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
