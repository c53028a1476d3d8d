//! The `Message` value type and its validating builder.

use crate::error::DomainError;
use crate::format::MessageFormat;
use crate::ids::MessageId;
use crate::priority::Priority;
use crate::target::Target;
use notifyhub_validate_derive::Validate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

/// Minimum number of targets a message may carry.
pub const MIN_TARGETS: usize = 1;
/// Maximum number of targets a message may carry.
pub const MAX_TARGETS: usize = 100;
/// Maximum title length in characters.
pub const MAX_TITLE_CHARS: usize = 200;
/// Maximum body length in characters.
pub const MAX_BODY_CHARS: usize = 4096;
/// Furthest a `scheduled_at` may sit in the future.
pub const MAX_SCHEDULE_HORIZON: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// An immutable, validated unit of work submitted to the executor.
///
/// Built exclusively through [`Message::builder`]; there is no public way to
/// construct one that skips validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(error = "DomainError")]
pub struct Message {
    /// Unique id, generated if the caller does not supply one.
    pub id: MessageId,
    /// Short headline, non-empty, no NUL bytes, bounded length.
    #[validate(non_empty)]
    pub title: String,
    /// Body text, non-empty, no NUL bytes, bounded length.
    #[validate(non_empty)]
    pub body: String,
    /// Rendering format.
    pub format: MessageFormat,
    /// Delivery priority.
    pub priority: Priority,
    /// Delivery destinations, 1..=100, order-preserving.
    pub targets: Vec<Target>,
    /// Template variables, substituted by the rendering layer.
    #[serde(default)]
    pub variables: HashMap<String, String>,
    /// Opaque pass-through metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Adapter-specific options, opaque to the core.
    #[serde(default)]
    pub platform_data: HashMap<String, String>,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Optional future delivery time.
    pub scheduled_at: Option<SystemTime>,
}

impl Message {
    /// Start building a message.
    #[must_use]
    pub fn builder(title: impl Into<String>, body: impl Into<String>) -> MessageBuilder {
        MessageBuilder {
            id: None,
            title: title.into(),
            body: body.into(),
            format: MessageFormat::default(),
            priority: Priority::default(),
            targets: Vec::new(),
            variables: HashMap::new(),
            metadata: HashMap::new(),
            platform_data: HashMap::new(),
            scheduled_at: None,
        }
    }

    /// True when this message is scheduled for future delivery.
    #[must_use]
    pub const fn is_scheduled(&self) -> bool {
        self.scheduled_at.is_some()
    }
}

/// Fluent, validating builder for [`Message`].
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    id: Option<MessageId>,
    title: String,
    body: String,
    format: MessageFormat,
    priority: Priority,
    targets: Vec<Target>,
    variables: HashMap<String, String>,
    metadata: HashMap<String, String>,
    platform_data: HashMap<String, String>,
    scheduled_at: Option<SystemTime>,
}

impl MessageBuilder {
    /// Override the generated id.
    #[must_use]
    pub fn id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the rendering format.
    #[must_use]
    pub fn format(mut self, format: MessageFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the delivery priority.
    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Append a single target.
    #[must_use]
    pub fn target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }

    /// Append multiple targets, preserving order.
    #[must_use]
    pub fn targets(mut self, targets: impl IntoIterator<Item = Target>) -> Self {
        self.targets.extend(targets);
        self
    }

    /// Attach a template variable.
    #[must_use]
    pub fn variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Attach opaque metadata.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach adapter-specific platform data.
    #[must_use]
    pub fn platform_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.platform_data.insert(key.into(), value.into());
        self
    }

    /// Schedule delivery for a future time.
    #[must_use]
    pub fn scheduled_at(mut self, at: SystemTime) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    /// Validate all invariants and build the final [`Message`].
    ///
    /// # Errors
    /// Returns [`DomainError`] when title/body are empty or too long, contain
    /// a NUL byte, the target count is out of range, any target fails its own
    /// validation, the format is invalid, or `scheduled_at` is not within the
    /// future-and-within-one-year window.
    pub fn build(self) -> Result<Message, DomainError> {
        use notifyhub_shared::Validate;

        if self.title.chars().count() > MAX_TITLE_CHARS {
            return Err(DomainError::out_of_range(
                "title",
                self.title.chars().count().to_string(),
                "1".to_string(),
                MAX_TITLE_CHARS.to_string(),
            ));
        }
        if self.title.contains('\0') {
            return Err(DomainError::invalid("title", "must not contain NUL bytes"));
        }
        if self.body.chars().count() > MAX_BODY_CHARS {
            return Err(DomainError::out_of_range(
                "body",
                self.body.chars().count().to_string(),
                "1".to_string(),
                MAX_BODY_CHARS.to_string(),
            ));
        }
        if self.body.contains('\0') {
            return Err(DomainError::invalid("body", "must not contain NUL bytes"));
        }
        if self.targets.len() < MIN_TARGETS || self.targets.len() > MAX_TARGETS {
            return Err(DomainError::out_of_range(
                "targets",
                self.targets.len().to_string(),
                MIN_TARGETS.to_string(),
                MAX_TARGETS.to_string(),
            ));
        }
        self.format.validate()?;

        let created_at = SystemTime::now();
        if let Some(scheduled_at) = self.scheduled_at {
            if scheduled_at <= created_at {
                return Err(DomainError::invalid(
                    "scheduled_at",
                    "must be in the future",
                ));
            }
            if scheduled_at
                .duration_since(created_at)
                .map(|elapsed| elapsed > MAX_SCHEDULE_HORIZON)
                .unwrap_or(false)
            {
                return Err(DomainError::invalid(
                    "scheduled_at",
                    "must be at most one year out",
                ));
            }
        }

        let message = Message {
            id: self.id.unwrap_or_else(MessageId::generate),
            title: self.title,
            body: self.body,
            format: self.format,
            priority: self.priority,
            targets: self.targets,
            variables: self.variables,
            metadata: self.metadata,
            platform_data: self.platform_data,
            created_at,
            scheduled_at: self.scheduled_at,
        };
        message.validate()?;
        Ok(message)
    }
}
