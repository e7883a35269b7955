//! # Store Errors
//!
//! Error types for the hierarchical survey store.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the survey store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Data file could not be read
    #[error("failed to read data file: {0}")]
    Io(#[from] std::io::Error),

    /// Data file is not valid JSON
    #[error("data file is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The tree root must be a JSON object keyed by partition name
    #[error("data root must be a JSON object")]
    NotAnObject,
}
