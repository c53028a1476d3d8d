//! Delivery targets.

use crate::error::DomainError;
use notifyhub_validate_derive::Validate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single delivery destination: who/where to send to, on which platform.
///
/// Validation of `value` (e.g. is it a well-formed email or phone number) is
/// delegated to the platform adapter that ultimately handles it; this type
/// only enforces that the three identifying fields are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(error = "DomainError")]
pub struct Target {
    /// Target kind, e.g. `"email"`, `"user"`, `"group"`, `"phone"`, `"webhook"`.
    #[validate(non_empty)]
    pub target_type: String,
    /// Opaque destination value, interpreted by the adapter.
    #[validate(non_empty)]
    pub value: String,
    /// Name of the platform adapter that should handle this target.
    #[validate(non_empty)]
    pub platform: String,
    /// Adapter-specific metadata, opaque to the core.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Target {
    /// Start building a target for the given platform.
    #[must_use]
    pub fn builder(target_type: impl Into<String>, value: impl Into<String>, platform: impl Into<String>) -> TargetBuilder {
        TargetBuilder {
            target_type: target_type.into(),
            value: value.into(),
            platform: platform.into(),
            metadata: HashMap::new(),
        }
    }
}

/// Fluent, validating builder for [`Target`].
#[derive(Debug, Clone)]
pub struct TargetBuilder {
    target_type: String,
    value: String,
    platform: String,
    metadata: HashMap<String, String>,
}

impl TargetBuilder {
    /// Attach a metadata entry.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Validate and build the final [`Target`].
    ///
    /// # Errors
    /// Returns [`DomainError`] when `target_type`, `value`, or `platform` is empty.
    pub fn build(self) -> Result<Target, DomainError> {
        use notifyhub_shared::Validate;
        let target = Target {
            target_type: self.target_type,
            value: self.value,
            platform: self.platform,
            metadata: self.metadata,
        };
        target.validate()?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_empty_fields() {
        let result = Target::builder("", "a@example.com", "smtp").build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_accepts_valid_target() {
        let target = Target::builder("email", "a@example.com", "smtp")
            .metadata("cc", "b@example.com")
            .build()
            .expect("valid target");
        assert_eq!(target.platform, "smtp");
        assert_eq!(target.metadata.get("cc").map(String::as_str), Some("b@example.com"));
    }
}
