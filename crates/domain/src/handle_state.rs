//! Handle lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`crate::MessageId`]'s delivery `Handle`.
///
/// Transitions: `Pending` → `Processing` → one of the terminal states.
/// A terminal state never reverts (enforced by callers via
/// [`HandleState::is_terminal`], not by this type alone).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleState {
    /// Created, and either sitting in the priority queue or the delay
    /// scheduler's heap awaiting promotion.
    Pending,
    /// A worker has picked up the item and is delivering it.
    Processing,
    /// Delivery finished; a [`crate::Receipt`] is available.
    Completed,
    /// Delivery could not proceed (validation, adapter, or queue failure).
    Failed,
    /// The caller cancelled before or during delivery.
    Cancelled,
}

impl HandleState {
    /// True for any state from which no further transition occurs.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Aggregated outcome of a [`crate::BatchHandle`] once every child has
/// reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total number of child messages in the batch.
    pub total: usize,
    /// Number of children that completed successfully.
    pub completed: usize,
    /// Number of children that failed or were cancelled.
    pub failed: usize,
}

impl BatchSummary {
    /// True once every child has reached a terminal state.
    #[must_use]
    pub const fn is_done(self) -> bool {
        self.completed + self.failed >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_terminal_states_report_terminal() {
        assert!(!HandleState::Pending.is_terminal());
        assert!(!HandleState::Processing.is_terminal());
        assert!(HandleState::Completed.is_terminal());
        assert!(HandleState::Failed.is_terminal());
        assert!(HandleState::Cancelled.is_terminal());
    }

    #[test]
    fn batch_summary_done_when_counts_cover_total() {
        let summary = BatchSummary { total: 3, completed: 2, failed: 1 };
        assert!(summary.is_done());
        let pending = BatchSummary { total: 3, completed: 1, failed: 0 };
        assert!(!pending.is_done());
    }
}
