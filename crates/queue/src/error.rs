//! Errors surfaced by the priority queue and delay scheduler.

use notifyhub_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use std::fmt;

/// Failure outcome of a queue or scheduler operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue has been shut down and rejects new submissions.
    Closed,
    /// The queue is at capacity.
    Full,
    /// The queue is closed and fully drained; dequeue has nothing left to return.
    ClosedEmpty,
    /// The caller's cancellation token fired while waiting.
    Cancelled,
}

impl fmt::Display for QueueError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => formatter.write_str("queue is closed"),
            Self::Full => formatter.write_str("queue is full"),
            Self::ClosedEmpty => formatter.write_str("queue is closed and drained"),
            Self::Cancelled => formatter.write_str("operation cancelled"),
        }
    }
}

impl std::error::Error for QueueError {}

impl From<QueueError> for ErrorEnvelope {
    fn from(error: QueueError) -> Self {
        match error {
            QueueError::Closed | QueueError::ClosedEmpty => {
                Self::expected(ErrorCode::queue_closed(), error.to_string())
            },
            QueueError::Full => Self::expected_with_class(
                ErrorCode::queue_full(),
                error.to_string(),
                ErrorClass::Retriable,
            ),
            QueueError::Cancelled => Self::cancelled(error.to_string()),
        }
    }
}
