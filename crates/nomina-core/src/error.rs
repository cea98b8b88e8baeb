//! Shared validation error type for identifier and amount construction.

use thiserror::Error;

/// Errors raised when constructing a domain primitive from raw input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The value does not match the required format.
    #[error("invalid {field}: {reason}")]
    InvalidFormat {
        /// Which field or identifier failed validation.
        field: &'static str,
        /// Human-readable description of the failure.
        reason: String,
    },

    /// A required value is missing.
    #[error("missing {field}")]
    Missing {
        /// Which field is absent.
        field: &'static str,
    },

    /// Two values that must not appear together both appeared.
    #[error("conflicting values: {reason}")]
    Conflict {
        /// Description of the conflict.
        reason: String,
    },
}

impl ValidationError {
    /// Shorthand for an [`ValidationError::InvalidFormat`] value.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            field,
            reason: reason.into(),
        }
    }
}
