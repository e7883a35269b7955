//! # Scan Errors
//!
//! Request-level scan failures. Per-entity problems (reduction errors,
//! single-partition fetch failures) are not errors at this level; the
//! scanner isolates them, logs, and continues.

use thiserror::Error;

use crate::expr::ValidationError;
use crate::store::StoreError;

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that abort a scan before or instead of producing output
#[derive(Debug, Error)]
pub enum ScanError {
    /// The filter expression was rejected
    #[error("invalid expression at position {position}: {reason}")]
    InvalidExpression { reason: String, position: usize },

    /// No roster could be discovered; there is nothing to scan
    #[error("no survey data found for this filter")]
    DataAbsent,

    /// A roster-level store read failed
    #[error("store read failed: {0}")]
    Store(#[from] StoreError),

    /// Anything else
    #[error("internal scan failure: {0}")]
    Unexpected(String),
}

impl From<ValidationError> for ScanError {
    fn from(err: ValidationError) -> Self {
        ScanError::InvalidExpression {
            reason: err.reason().to_string(),
            position: err.position(),
        }
    }
}

impl ScanError {
    /// HTTP status class for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ScanError::InvalidExpression { .. } | ScanError::DataAbsent => 400,
            ScanError::Store(_) | ScanError::Unexpected(_) => 500,
        }
    }

    /// 1-based token position for validation failures
    pub fn position(&self) -> Option<usize> {
        match self {
            ScanError::InvalidExpression { position, .. } => Some(*position),
            _ => None,
        }
    }
}
