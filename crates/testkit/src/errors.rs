//! Test fixtures for shared error codes and envelopes.

use notifyhub_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Return a list of common error codes used in tests.
pub fn common_error_codes() -> Vec<ErrorCode> {
    vec![
        ErrorCode::cancelled(),
        ErrorCode::invalid_input(),
        ErrorCode::not_found(),
        ErrorCode::timeout(),
        ErrorCode::io(),
        ErrorCode::internal(),
        ErrorCode::validation(),
        ErrorCode::queue_closed(),
        ErrorCode::queue_full(),
        ErrorCode::no_targets(),
        ErrorCode::adapter(),
        ErrorCode::capacity_exceeded(),
    ]
}

/// A cancellation error fixture.
pub fn cancelled_error() -> ErrorEnvelope {
    ErrorEnvelope::cancelled("cancelled")
}

/// An invalid input error fixture.
pub fn invalid_input_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::invalid_input(), "invalid input")
}

/// A retriable timeout error fixture.
pub fn timeout_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(ErrorCode::timeout(), "timeout", ErrorClass::Retriable)
}

/// A closed-queue error fixture, as raised when submitting work after shutdown.
pub fn queue_closed_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::queue_closed(), "queue is closed")
}

/// A full-queue error fixture, as raised when the bounded queue is at capacity.
pub fn queue_full_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::queue_full(), "queue is full")
}

/// A no-targets error fixture, as raised when a message resolves to zero
/// deliverable targets (e.g. every target's platform adapter is unregistered).
pub fn no_targets_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::no_targets(), "message has no deliverable targets")
}

/// A retriable adapter-failure error fixture, as raised when a platform
/// adapter cannot attempt delivery at all (not a per-target failure).
pub fn adapter_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(ErrorCode::adapter(), "adapter failed to attempt delivery", ErrorClass::Retriable)
}

/// A capacity-exceeded error fixture, as raised when a batch submission
/// would exceed the configured in-flight handle limit.
pub fn capacity_exceeded_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::capacity_exceeded(), "capacity exceeded")
}
