//! Lifecycle events delivered to registered callbacks.

use crate::handle_state::BatchSummary;
use crate::message::Message;
use crate::receipt::Receipt;
use notifyhub_shared::ErrorEnvelope;

/// A lifecycle event fanned out to global and per-message callbacks.
///
/// Deliberately a closed enum rather than a dynamic metadata bag: each
/// variant carries exactly the payload its corresponding callback slot
/// expects, so dispatch is a `match`, not a downcast.
#[derive(Debug, Clone)]
pub enum CallbackEvent {
    /// A message finished delivery with a final receipt.
    Result(Receipt),
    /// A message could not be delivered at all.
    Error(Message, ErrorEnvelope),
    /// A batch made progress; `completed` and `total` count child handles.
    Progress {
        /// Number of children that have reached a terminal state.
        completed: usize,
        /// Total number of children in the batch.
        total: usize,
    },
    /// A batch reached its terminal state.
    Complete(BatchSummary),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_event_carries_counts() {
        let event = CallbackEvent::Progress { completed: 2, total: 5 };
        assert!(matches!(event, CallbackEvent::Progress { completed: 2, total: 5 }));
    }
}
