//! API v1 DTO types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error kind exposed in API v1 responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiV1ErrorKind {
    /// Expected, user-facing errors (validation, cancellation, adapter rejection).
    Expected,
    /// Invariant violations that indicate a bug.
    Invariant,
}

/// API v1 error code string (stable contract value).
pub type ApiV1ErrorCode = String;

/// Metadata map attached to API v1 errors.
pub type ApiV1ErrorMeta = BTreeMap<String, String>;

/// API v1 error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiV1ErrorDto {
    /// Stable error code (e.g. `ERR_QUEUE_FULL`).
    pub code: ApiV1ErrorCode,
    /// Human-readable message for the caller.
    pub message: String,
    /// Error category.
    pub kind: ApiV1ErrorKind,
    /// Optional metadata for debugging and correlation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ApiV1ErrorMeta>,
}

/// API v1 result wrapper for success or failure payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiV1Result<T> {
    /// Success response.
    Ok {
        /// Indicates success.
        ok: bool,
        /// Success payload.
        data: T,
    },
    /// Error response.
    Err {
        /// Indicates failure.
        ok: bool,
        /// Error payload.
        error: ApiV1ErrorDto,
    },
}

impl<T> ApiV1Result<T> {
    /// Build a success response wrapper.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self::Ok { ok: true, data }
    }

    /// Build an error response wrapper.
    #[must_use]
    pub const fn err(error: ApiV1ErrorDto) -> Self {
        Self::Err { ok: false, error }
    }
}

/// Wire priority, mirrors `notifyhub_domain::Priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApiV1Priority {
    /// Lowest priority tier.
    Low,
    /// Default priority tier.
    Normal,
    /// Elevated priority tier.
    High,
    /// Most urgent tier; always dequeued first.
    Urgent,
}

impl Default for ApiV1Priority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Wire message format, mirrors `notifyhub_domain::MessageFormat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApiV1MessageFormat {
    /// Plain text, no markup.
    Text,
    /// Markdown markup.
    Markdown,
    /// HTML markup.
    Html,
    /// Structured card payload; adapters interpret the shape further.
    Card {
        /// Opaque JSON object, validated only for being an object.
        payload: serde_json::Value,
    },
}

impl Default for ApiV1MessageFormat {
    fn default() -> Self {
        Self::Text
    }
}

/// Wire delivery target.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, notifyhub_validate_derive::Validate,
)]
#[serde(rename_all = "camelCase")]
#[validate(error = "crate::v1::validation::ApiV1ValidationIssue")]
pub struct ApiV1TargetDto {
    /// Target kind, e.g. `"email"`, `"user"`, `"phone"`, `"webhook"`.
    #[validate(non_empty)]
    pub target_type: String,
    /// Opaque destination value, interpreted by the adapter.
    #[validate(non_empty)]
    pub value: String,
    /// Name of the platform adapter that should handle this target.
    #[validate(non_empty)]
    pub platform: String,
    /// Adapter-specific metadata, opaque to the core.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// API v1 request to submit a message for delivery (sync or async).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, notifyhub_validate_derive::Validate)]
#[serde(rename_all = "camelCase")]
#[validate(error = "crate::v1::validation::ApiV1ValidationIssue")]
pub struct ApiV1MessageRequestDto {
    /// Short headline, non-empty, ≤200 chars.
    #[validate(non_empty)]
    pub title: String,
    /// Body text, non-empty, ≤4096 chars.
    #[validate(non_empty)]
    pub body: String,
    /// Rendering format; defaults to plain text.
    #[serde(default)]
    pub format: ApiV1MessageFormat,
    /// Delivery priority; defaults to normal.
    #[serde(default)]
    pub priority: ApiV1Priority,
    /// Delivery destinations, 1..=100, order-preserving. Count is enforced by
    /// [`crate::v1::validate_message_request`], not the derive macro, which
    /// only checks scalar fields.
    pub targets: Vec<ApiV1TargetDto>,
    /// Template variables substituted by the rendering layer.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
    /// Opaque pass-through metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Adapter-specific options, opaque to the core.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platform_data: BTreeMap<String, String>,
    /// RFC 3339 timestamp for future delivery, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,
}

/// Overall outcome of a [`ApiV1ReceiptDto`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApiV1ReceiptStatus {
    /// Every target succeeded.
    Success,
    /// At least one target succeeded and at least one failed.
    Partial,
    /// Every target failed.
    Failed,
}

/// Per-target delivery outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiV1SendResultDto {
    /// The target this result describes.
    pub target: ApiV1TargetDto,
    /// Platform adapter that handled the target.
    pub platform: String,
    /// Whether delivery succeeded.
    pub success: bool,
    /// Error description; empty when `success` is true.
    pub error: String,
    /// Milliseconds since the Unix epoch when the adapter call started.
    pub started_at_unix_ms: u64,
    /// How long the adapter call took, in milliseconds.
    pub duration_ms: u64,
    /// Number of attempts made, including the final one.
    pub attempts: u32,
}

/// Aggregated outcome of one message, returned from a send/schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiV1ReceiptDto {
    /// The message this receipt describes.
    pub message_id: String,
    /// Overall status derived from the per-target results.
    pub status: ApiV1ReceiptStatus,
    /// Total number of targets.
    pub total: usize,
    /// Number of targets that succeeded.
    pub successful: usize,
    /// Number of targets that failed.
    pub failed: usize,
    /// Per-target results, in target order.
    pub results: Vec<ApiV1SendResultDto>,
    /// Milliseconds since the Unix epoch when the last result was recorded.
    pub completed_at_unix_ms: u64,
}

/// Lifecycle state of a [`ApiV1HandleStatusDto`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApiV1HandleState {
    /// Queued or scheduled, not yet picked up by a worker.
    Pending,
    /// A worker is delivering it.
    Processing,
    /// Delivery finished successfully or partially; a receipt is attached.
    Completed,
    /// Delivery failed outright.
    Failed,
    /// The caller cancelled it.
    Cancelled,
}

/// Point-in-time status of a single message's `Handle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiV1HandleStatusDto {
    /// The message id this handle tracks.
    pub message_id: String,
    /// Current lifecycle state.
    pub state: ApiV1HandleState,
    /// Delivery progress in `[0, 1]`.
    pub progress: f64,
    /// Error recorded on the most recent non-success transition, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ApiV1ErrorDto>,
    /// Final receipt, present once `state` is `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ApiV1ReceiptDto>,
    /// Milliseconds since the Unix epoch when this snapshot was produced.
    pub updated_at_unix_ms: u64,
}

/// Point-in-time status of a batch submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiV1BatchStatusDto {
    /// Total number of child messages in the batch.
    pub total: usize,
    /// Number of children that completed successfully.
    pub completed: usize,
    /// Number of children that failed or were cancelled.
    pub failed: usize,
    /// True once every child has reached a terminal state.
    pub done: bool,
}

/// Immediate-queue counters, nested under [`ApiV1ExecutorStatsDto`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiV1QueueStatsDto {
    /// Total items ever enqueued.
    pub enqueued: u64,
    /// Total items ever dequeued.
    pub dequeued: u64,
    /// Items rejected because the queue was full.
    pub rejected_full: u64,
    /// Current depth, in priority order `[low, normal, high, urgent]`.
    pub per_priority: [usize; 4],
    /// Uptime of the queue, in milliseconds.
    pub uptime_ms: u64,
}

/// Per-worker snapshot, nested under [`ApiV1ExecutorStatsDto`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiV1WorkerStatsDto {
    /// Worker's pool-local id.
    pub id: usize,
    /// Current lifecycle state.
    pub state: String,
    /// Platform affinity tags, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affinity: Vec<String>,
    /// Items processed over the worker's lifetime.
    pub processed: u64,
    /// Items that failed dispatch.
    pub errors: u64,
    /// Exponential moving average dispatch latency, in milliseconds.
    pub ema_latency_ms: f64,
    /// Time since the worker's last activity, in milliseconds.
    pub idle_for_ms: u64,
}

/// Callback registry counters, nested under [`ApiV1ExecutorStatsDto`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiV1CallbackStatsDto {
    /// Executions that ran to completion (success or failed, not dropped).
    pub executed: u64,
    /// Executions that succeeded.
    pub succeeded: u64,
    /// Executions that failed (including panics).
    pub failed: u64,
    /// Executions dropped because the execution queue was full.
    pub dropped_full: u64,
    /// Items currently sitting in the dead-letter buffer.
    pub dead_letter_len: usize,
}

/// Combined operational snapshot across every executor subsystem, suitable
/// for an operator dashboard. Mirrors `notifyhub_app::ExecutorStats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiV1ExecutorStatsDto {
    /// Milliseconds since the executor was started.
    pub since_started_ms: u64,
    /// True only when every owned subsystem reports healthy.
    pub healthy: bool,
    /// True if any owned subsystem reports itself unhealthy.
    pub degraded: bool,
    /// Immediate-queue counters.
    pub queue: ApiV1QueueStatsDto,
    /// Delay-scheduler items still waiting on their `scheduledAt` time.
    pub delayed_count: usize,
    /// Per-worker snapshots.
    pub workers: Vec<ApiV1WorkerStatsDto>,
    /// Callback registry counters.
    pub callbacks: ApiV1CallbackStatsDto,
    /// Handles currently tracked by the handle registry.
    pub handles_tracked: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn dto_roundtrip_json() -> Result<(), Box<dyn Error>> {
        let target = ApiV1TargetDto {
            target_type: "email".to_string(),
            value: "a@example.com".to_string(),
            platform: "smtp".to_string(),
            metadata: BTreeMap::new(),
        };
        let request = ApiV1MessageRequestDto {
            title: "hi".to_string(),
            body: "there".to_string(),
            format: ApiV1MessageFormat::Text,
            priority: ApiV1Priority::High,
            targets: vec![target.clone()],
            variables: BTreeMap::new(),
            metadata: BTreeMap::new(),
            platform_data: BTreeMap::new(),
            scheduled_at: None,
        };
        let json = serde_json::to_string(&request)?;
        let parsed: ApiV1MessageRequestDto = serde_json::from_str(&json)?;
        assert_eq!(parsed, request);

        let send_result = ApiV1SendResultDto {
            target,
            platform: "smtp".to_string(),
            success: true,
            error: String::new(),
            started_at_unix_ms: 1000,
            duration_ms: 5,
            attempts: 1,
        };
        let receipt = ApiV1ReceiptDto {
            message_id: "msg_1".to_string(),
            status: ApiV1ReceiptStatus::Success,
            total: 1,
            successful: 1,
            failed: 0,
            results: vec![send_result],
            completed_at_unix_ms: 1005,
        };
        let receipt_json = serde_json::to_string(&receipt)?;
        let parsed_receipt: ApiV1ReceiptDto = serde_json::from_str(&receipt_json)?;
        assert_eq!(parsed_receipt, receipt);

        let ok_result = ApiV1Result::ok(receipt);
        let ok_json = serde_json::to_string(&ok_result)?;
        let parsed_ok: ApiV1Result<ApiV1ReceiptDto> = serde_json::from_str(&ok_json)?;
        assert_eq!(parsed_ok, ok_result);

        Ok(())
    }
}
