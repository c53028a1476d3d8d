//! Validation error type for domain builders.

use notifyhub_shared::ValidationError;
use std::fmt;

/// Failure building or validating a [`crate::Message`] or [`crate::Target`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A required field was empty.
    Empty {
        /// Field name.
        field: &'static str,
    },
    /// A field value failed a specific check.
    Invalid {
        /// Field name.
        field: &'static str,
        /// Human-readable reason.
        reason: &'static str,
    },
    /// A numeric or count field fell outside its allowed range.
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Provided value, stringified.
        value: String,
        /// Inclusive lower bound, stringified.
        min: String,
        /// Inclusive upper bound, stringified.
        max: String,
    },
}

impl ValidationError for DomainError {
    fn empty(field: &'static str) -> Self {
        Self::Empty { field }
    }

    fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::Invalid { field, reason }
    }

    fn out_of_range(field: &'static str, value: String, min: String, max: String) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(formatter, "{field} must not be empty"),
            Self::Invalid { field, reason } => write!(formatter, "{field} is invalid: {reason}"),
            Self::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(
                formatter,
                "{field} value {value} is outside [{min}, {max}]"
            ),
        }
    }
}

impl std::error::Error for DomainError {}

impl From<DomainError> for notifyhub_shared::ErrorEnvelope {
    fn from(error: DomainError) -> Self {
        Self::expected(notifyhub_shared::ErrorCode::validation(), error.to_string())
    }
}
