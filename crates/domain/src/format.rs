//! Message body formats.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a message body should be rendered by the receiving platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageFormat {
    /// Plain text, no markup.
    Text,
    /// Markdown markup.
    Markdown,
    /// HTML markup.
    Html,
    /// Structured card payload; adapters interpret the shape further.
    Card {
        /// Opaque JSON object describing the card. Validated only for being
        /// an object — deeper structure is an adapter concern.
        payload: Value,
    },
}

impl Default for MessageFormat {
    fn default() -> Self {
        Self::Text
    }
}

impl MessageFormat {
    /// Validate format-specific invariants.
    ///
    /// # Errors
    /// Returns [`DomainError::Invalid`] when a `Card` payload is not a JSON object.
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Self::Card { payload } = self {
            if !payload.is_object() {
                return Err(DomainError::invalid("format", "card payload must be a JSON object"));
            }
        }
        Ok(())
    }
}
