//! API v1 DTO mapping helpers.

use crate::v1::{
    ApiV1BatchStatusDto, ApiV1CallbackStatsDto, ApiV1ErrorCode, ApiV1ErrorDto, ApiV1ErrorKind,
    ApiV1ErrorMeta, ApiV1ExecutorStatsDto, ApiV1HandleState, ApiV1HandleStatusDto,
    ApiV1MessageFormat, ApiV1MessageRequestDto, ApiV1Priority, ApiV1QueueStatsDto,
    ApiV1ReceiptDto, ApiV1ReceiptStatus, ApiV1Result, ApiV1SendResultDto, ApiV1TargetDto,
    ApiV1WorkerStatsDto,
};
use notifyhub_app::{BatchHandle, BatchProgress, CallbackRegistryStats, ExecutorStats, HandleSnapshot, WorkerStats};
use notifyhub_domain::{
    DomainError, HandleState, MessageFormat, Priority, Receipt, ReceiptStatus, SendResult, Target,
};
use notifyhub_shared::{ErrorEnvelope, ErrorKind};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const API_V1_REDACTED: &str = "[REDACTED]";
const API_V1_REDACTED_PREFIX: &str = "[REDACTED,len=";

/// Convert a shared `ErrorCode` into an API v1 error code string.
#[must_use]
pub fn error_code_to_api_v1(code: &notifyhub_shared::ErrorCode) -> ApiV1ErrorCode {
    let namespace = sanitize_code_segment(code.namespace());
    let detail = sanitize_code_segment(code.code());
    format!("ERR_{namespace}_{detail}")
}

/// Map an `ErrorEnvelope` into an API v1 error DTO.
#[must_use]
pub fn error_envelope_to_api_v1_error(
    envelope: &ErrorEnvelope,
    extra_meta: Option<ApiV1ErrorMeta>,
) -> ApiV1ErrorDto {
    let mut merged = ApiV1ErrorMeta::new();
    for (key, value) in &envelope.metadata {
        merged.insert(key.clone(), value.clone());
    }
    if let Some(extra) = extra_meta {
        for (key, value) in extra {
            merged.insert(key, value);
        }
    }
    let meta = if merged.is_empty() {
        None
    } else {
        Some(redact_api_v1_meta(&merged))
    };

    ApiV1ErrorDto {
        code: error_code_to_api_v1(&envelope.code),
        message: envelope.message.clone(),
        kind: map_error_kind(envelope.kind),
        meta,
    }
}

/// Map a shared result into an API v1 result wrapper.
#[must_use]
pub fn result_to_api_v1_result<T>(
    result: Result<T, ErrorEnvelope>,
    extra_meta: Option<ApiV1ErrorMeta>,
) -> ApiV1Result<T> {
    match result {
        Ok(data) => ApiV1Result::ok(data),
        Err(error) => ApiV1Result::err(error_envelope_to_api_v1_error(&error, extra_meta)),
    }
}

const fn map_error_kind(kind: ErrorKind) -> ApiV1ErrorKind {
    match kind {
        ErrorKind::Expected | ErrorKind::Unexpected => ApiV1ErrorKind::Expected,
        ErrorKind::Invariant => ApiV1ErrorKind::Invariant,
    }
}

fn sanitize_code_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn redact_api_v1_meta(meta: &ApiV1ErrorMeta) -> ApiV1ErrorMeta {
    let mut redacted = ApiV1ErrorMeta::new();
    for (key, value) in meta {
        let redacted_value = if notifyhub_shared::is_secret_key(key) {
            API_V1_REDACTED.to_string()
        } else if is_query_key(key) {
            format!("{API_V1_REDACTED_PREFIX}{}]", value.len())
        } else {
            value.clone()
        };
        redacted.insert(key.clone(), redacted_value);
    }
    redacted
}

fn is_query_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key == "query" || key.ends_with("query") || key == "content" || key == "body"
}

fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

fn priority_from_api_v1(priority: ApiV1Priority) -> Priority {
    match priority {
        ApiV1Priority::Low => Priority::Low,
        ApiV1Priority::Normal => Priority::Normal,
        ApiV1Priority::High => Priority::High,
        ApiV1Priority::Urgent => Priority::Urgent,
    }
}

fn format_from_api_v1(format: ApiV1MessageFormat) -> MessageFormat {
    match format {
        ApiV1MessageFormat::Text => MessageFormat::Text,
        ApiV1MessageFormat::Markdown => MessageFormat::Markdown,
        ApiV1MessageFormat::Html => MessageFormat::Html,
        ApiV1MessageFormat::Card { payload } => MessageFormat::Card { payload },
    }
}

/// Map a wire target DTO into a validated domain [`Target`].
///
/// # Errors
/// Returns [`DomainError`] when any of the three identifying fields is empty.
pub fn target_dto_to_domain(dto: ApiV1TargetDto) -> Result<Target, DomainError> {
    let mut builder = Target::builder(dto.target_type, dto.value, dto.platform);
    for (key, value) in dto.metadata {
        builder = builder.metadata(key, value);
    }
    builder.build()
}

/// Map a wire message request into a validated domain [`notifyhub_domain::Message`].
///
/// `scheduled_at`, if present, is parsed as an RFC 3339 timestamp relative to
/// the Unix epoch; a malformed timestamp is reported as an invalid-field
/// error rather than panicking.
///
/// # Errors
/// Returns [`DomainError`] when any target is invalid, the message invariants
/// are violated, or `scheduled_at` cannot be parsed.
pub fn message_request_to_domain(
    dto: ApiV1MessageRequestDto,
) -> Result<notifyhub_domain::Message, DomainError> {
    let mut builder = notifyhub_domain::Message::builder(dto.title, dto.body)
        .format(format_from_api_v1(dto.format))
        .priority(priority_from_api_v1(dto.priority));

    let mut targets = Vec::with_capacity(dto.targets.len());
    for target in dto.targets {
        targets.push(target_dto_to_domain(target)?);
    }
    builder = builder.targets(targets);

    for (key, value) in dto.variables {
        builder = builder.variable(key, value);
    }
    for (key, value) in dto.metadata {
        builder = builder.metadata(key, value);
    }
    for (key, value) in dto.platform_data {
        builder = builder.platform_data(key, value);
    }
    if let Some(scheduled_at) = dto.scheduled_at {
        let parsed_millis: u64 = scheduled_at.parse().map_err(|_err| {
            DomainError::invalid("scheduled_at", "must be milliseconds since the Unix epoch")
        })?;
        builder = builder.scheduled_at(UNIX_EPOCH + Duration::from_millis(parsed_millis));
    }

    builder.build()
}

fn send_result_to_api_v1(result: &SendResult) -> ApiV1SendResultDto {
    ApiV1SendResultDto {
        target: ApiV1TargetDto {
            target_type: result.target.target_type.clone(),
            value: result.target.value.clone(),
            platform: result.target.platform.clone(),
            metadata: result.target.metadata.clone().into_iter().collect(),
        },
        platform: result.platform.clone(),
        success: result.success,
        error: result.error.clone(),
        started_at_unix_ms: unix_millis(result.started_at),
        duration_ms: u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
        attempts: result.attempts,
    }
}

/// Map a domain [`Receipt`] into its wire representation.
#[must_use]
pub fn receipt_to_api_v1(receipt: &Receipt) -> ApiV1ReceiptDto {
    ApiV1ReceiptDto {
        message_id: receipt.message_id.as_str().to_string(),
        status: match receipt.status {
            ReceiptStatus::Success => ApiV1ReceiptStatus::Success,
            ReceiptStatus::Partial => ApiV1ReceiptStatus::Partial,
            ReceiptStatus::Failed => ApiV1ReceiptStatus::Failed,
        },
        total: receipt.total,
        successful: receipt.successful,
        failed: receipt.failed,
        results: receipt.results.iter().map(send_result_to_api_v1).collect(),
        completed_at_unix_ms: unix_millis(receipt.completed_at),
    }
}

/// Map a [`HandleSnapshot`] into its wire representation.
#[must_use]
pub fn handle_snapshot_to_api_v1(
    message_id: &str,
    snapshot: &HandleSnapshot,
) -> ApiV1HandleStatusDto {
    ApiV1HandleStatusDto {
        message_id: message_id.to_string(),
        state: match snapshot.state {
            HandleState::Pending => ApiV1HandleState::Pending,
            HandleState::Processing => ApiV1HandleState::Processing,
            HandleState::Completed => ApiV1HandleState::Completed,
            HandleState::Failed => ApiV1HandleState::Failed,
            HandleState::Cancelled => ApiV1HandleState::Cancelled,
        },
        progress: snapshot.progress,
        last_error: snapshot
            .last_error
            .as_ref()
            .map(|error| error_envelope_to_api_v1_error(error, None)),
        receipt: snapshot.receipt.as_ref().map(receipt_to_api_v1),
        updated_at_unix_ms: unix_millis(snapshot.updated_at),
    }
}

/// Map a [`BatchHandle`]'s current counters into its wire representation.
///
/// Unlike [`handle_snapshot_to_api_v1`], this reads live atomics rather than
/// a settled snapshot, since a batch's final [`notifyhub_domain::BatchSummary`]
/// is only available once [`BatchHandle::is_done`] is true.
#[must_use]
pub fn batch_handle_to_api_v1(batch: &BatchHandle) -> ApiV1BatchStatusDto {
    let (completed, failed, total) = batch.counters();
    ApiV1BatchStatusDto {
        total,
        completed,
        failed,
        done: batch.is_done(),
    }
}

/// Map a [`BatchProgress`] notification into a `(completed, total)` pair, for
/// callers streaming progress over the wire.
#[must_use]
pub const fn batch_progress_to_api_v1(progress: BatchProgress) -> (usize, usize) {
    (progress.completed, progress.total)
}

fn worker_stats_to_api_v1(stats: &WorkerStats) -> ApiV1WorkerStatsDto {
    ApiV1WorkerStatsDto {
        id: stats.id,
        state: format!("{:?}", stats.state).to_ascii_lowercase(),
        affinity: stats
            .affinity
            .as_ref()
            .map(|affinity| affinity.platforms.iter().cloned().collect())
            .unwrap_or_default(),
        processed: stats.processed,
        errors: stats.errors,
        ema_latency_ms: stats.ema_latency.as_secs_f64() * 1000.0,
        idle_for_ms: u64::try_from(stats.idle_for.as_millis()).unwrap_or(u64::MAX),
    }
}

fn callback_stats_to_api_v1(stats: &CallbackRegistryStats) -> ApiV1CallbackStatsDto {
    ApiV1CallbackStatsDto {
        executed: stats.executed,
        succeeded: stats.succeeded,
        failed: stats.failed,
        dropped_full: stats.dropped_full,
        dead_letter_len: stats.dead_letter_len,
    }
}

/// Map an [`ExecutorStats`] snapshot into its wire representation.
#[must_use]
pub fn executor_stats_to_api_v1(stats: &ExecutorStats) -> ApiV1ExecutorStatsDto {
    ApiV1ExecutorStatsDto {
        since_started_ms: u64::try_from(stats.since_started.as_millis()).unwrap_or(u64::MAX),
        healthy: stats.healthy,
        degraded: stats.degraded,
        queue: ApiV1QueueStatsDto {
            enqueued: stats.queue.enqueued,
            dequeued: stats.queue.dequeued,
            rejected_full: stats.queue.rejected_full,
            per_priority: stats.queue.per_priority,
            uptime_ms: u64::try_from(stats.queue.uptime().as_millis()).unwrap_or(u64::MAX),
        },
        delayed_count: stats.delayed_count,
        workers: stats.workers.iter().map(worker_stats_to_api_v1).collect(),
        callbacks: callback_stats_to_api_v1(&stats.callbacks),
        handles_tracked: stats.handles_tracked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifyhub_shared::{ErrorClass, ErrorCode};
    use std::collections::BTreeMap;
    use std::error::Error;

    #[test]
    fn mapping_redacts_sensitive_metadata() -> Result<(), Box<dyn Error>> {
        let envelope = ErrorEnvelope::expected(ErrorCode::new("notifyhub", "adapter"), "bad target")
            .with_metadata("token", "secret-token")
            .with_metadata("apiKey", "sk-123")
            .with_metadata("query", "hello world")
            .with_metadata("path", "targets/0");

        let dto = error_envelope_to_api_v1_error(&envelope, None);
        let meta = dto
            .meta
            .ok_or_else(|| std::io::Error::other("meta should be present"))?;
        assert_eq!(dto.code, "ERR_NOTIFYHUB_ADAPTER");
        assert_eq!(dto.kind, ApiV1ErrorKind::Expected);
        assert_eq!(meta.get("token").map(String::as_str), Some("[REDACTED]"));
        assert_eq!(meta.get("apiKey").map(String::as_str), Some("[REDACTED]"));
        assert_eq!(
            meta.get("query").map(String::as_str),
            Some("[REDACTED,len=11]")
        );
        assert_eq!(meta.get("path").map(String::as_str), Some("targets/0"));
        Ok(())
    }

    #[test]
    fn result_mapping_preserves_ok_and_err() {
        let ok_result: Result<u32, ErrorEnvelope> = Ok(10);
        let mapped = result_to_api_v1_result(ok_result, None);
        assert!(matches!(mapped, ApiV1Result::Ok { ok: true, .. }));

        let mut extra = BTreeMap::new();
        extra.insert("requestId".to_string(), "abc".to_string());
        let err_result: Result<u32, ErrorEnvelope> =
            Err(ErrorEnvelope::expected(ErrorCode::invalid_input(), "bad input"));
        let mapped = result_to_api_v1_result(err_result, Some(extra));
        assert!(matches!(mapped, ApiV1Result::Err { ok: false, .. }));
    }

    #[test]
    fn message_request_maps_to_domain() -> Result<(), Box<dyn Error>> {
        let request = ApiV1MessageRequestDto {
            title: "hi".to_string(),
            body: "there".to_string(),
            format: ApiV1MessageFormat::Text,
            priority: ApiV1Priority::Urgent,
            targets: vec![ApiV1TargetDto {
                target_type: "email".to_string(),
                value: "a@example.com".to_string(),
                platform: "smtp".to_string(),
                metadata: BTreeMap::new(),
            }],
            variables: BTreeMap::new(),
            metadata: BTreeMap::new(),
            platform_data: BTreeMap::new(),
            scheduled_at: None,
        };
        let message = message_request_to_domain(request)?;
        assert_eq!(message.priority, Priority::Urgent);
        assert_eq!(message.targets.len(), 1);
        Ok(())
    }

    #[test]
    fn receipt_roundtrips_status() {
        let target = Target::builder("email", "a@example.com", "smtp")
            .build()
            .expect("valid target");
        let now = SystemTime::now();
        let result = SendResult::success(target, "smtp", now, Duration::from_millis(4), 1);
        let receipt = Receipt::from_results(notifyhub_domain::MessageId::generate(), vec![result], now);
        let dto = receipt_to_api_v1(&receipt);
        assert_eq!(dto.status, ApiV1ReceiptStatus::Success);
        assert_eq!(dto.results.len(), 1);
    }
}
