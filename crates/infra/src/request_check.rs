//! Request validation helpers for CLI/facade surfaces.
//!
//! `Message` derives `Deserialize` directly (so it can round-trip through a
//! queue backend's payload), but that derive only re-checks the
//! `#[validate(non_empty)]` fields — it does not re-run
//! [`Message::builder`]'s length, target-count, or schedule-window checks.
//! Parsing an untrusted request body therefore goes through
//! [`SendMessageRequest`] and the builder, never a bare
//! `serde_json::from_str::<Message>`.

use crate::InfraResult;
use notifyhub_domain::{Message, MessageFormat, Priority, Target};
use notifyhub_shared::{ErrorCode, ErrorEnvelope};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::SystemTime;

/// One delivery destination as supplied by a caller, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRequest {
    /// Target kind, e.g. `"email"`, `"phone"`, `"webhook"`.
    pub target_type: String,
    /// Opaque destination value.
    pub value: String,
    /// Name of the platform adapter that should handle this target.
    pub platform: String,
    /// Adapter-specific metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A message submission as supplied by a caller, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Short headline.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Rendering format.
    #[serde(default)]
    pub format: MessageFormat,
    /// Delivery priority.
    #[serde(default)]
    pub priority: Priority,
    /// Delivery destinations.
    pub targets: Vec<TargetRequest>,
    /// Template variables, substituted by the rendering layer.
    #[serde(default)]
    pub variables: HashMap<String, String>,
    /// Opaque pass-through metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Adapter-specific options, opaque to the core.
    #[serde(default)]
    pub platform_data: HashMap<String, String>,
    /// Optional future delivery time.
    #[serde(default)]
    pub scheduled_at: Option<SystemTime>,
}

/// Parse and validate a [`SendMessageRequest`] JSON payload into a [`Message`].
///
/// # Errors
/// Returns an [`crate::InfraError`] if the JSON is malformed, or the message
/// fails any builder invariant (empty/oversized title or body, target count
/// out of range, an invalid target, or an out-of-window schedule).
pub fn validate_send_message_request_json(input_json: &str) -> InfraResult<Message> {
    let request: SendMessageRequest = serde_json::from_str(input_json).map_err(|error| {
        ErrorEnvelope::expected(ErrorCode::validation(), format!("invalid send-message request JSON: {error}"))
    })?;

    let mut builder = Message::builder(request.title, request.body).format(request.format).priority(request.priority);

    for target in request.targets {
        let mut target_builder = Target::builder(target.target_type, target.value, target.platform);
        for (key, value) in target.metadata {
            target_builder = target_builder.metadata(key, value);
        }
        builder = builder.target(target_builder.build()?);
    }

    for (key, value) in request.variables {
        builder = builder.variable(key, value);
    }
    for (key, value) in request.metadata {
        builder = builder.metadata(key, value);
    }
    for (key, value) in request.platform_data {
        builder = builder.platform_data(key, value);
    }
    if let Some(scheduled_at) = request.scheduled_at {
        builder = builder.scheduled_at(scheduled_at);
    }

    Ok(builder.build()?)
}
