//! Expression error types
//!
//! Validation failures carry a human-readable reason and the 1-based
//! token position they refer to. Evaluation errors are per-entity and
//! never abort a scan.

use std::fmt;

/// A rejected filter expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    reason: String,
    position: usize,
}

impl ValidationError {
    /// Create a validation error at a 1-based token position
    pub fn new(reason: impl Into<String>, position: usize) -> Self {
        Self {
            reason: reason.into(),
            position,
        }
    }

    /// Returns the rejection reason
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the 1-based token position
    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid expression at position {}: {}",
            self.position, self.reason
        )
    }
}

impl std::error::Error for ValidationError {}

/// A token sequence the builder could not reduce to a single tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildError {
    reason: String,
}

impl BuildError {
    /// Create a build error
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the failure reason
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expression is not reducible: {}", self.reason)
    }
}

impl std::error::Error for BuildError {}

/// A per-entity reduction failure (unknown label in the boolean map)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    label: String,
}

impl EvalError {
    /// Create an evaluation error for an unresolved label
    pub fn unknown_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Returns the label that had no boolean result
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no boolean result for label {}", self.label)
    }
}

impl std::error::Error for EvalError {}
