//! Queue health and statistics snapshots.

use notifyhub_domain::Priority;
use std::time::{Duration, Instant};

/// Point-in-time counters for a [`crate::priority::PriorityQueue`].
#[derive(Debug, Clone, Copy)]
pub struct QueueStatistics {
    /// Total items ever enqueued.
    pub enqueued: u64,
    /// Total items ever dequeued.
    pub dequeued: u64,
    /// Items rejected because the queue was full.
    pub rejected_full: u64,
    /// Items currently queued, per priority lane (indexed by [`Priority::lane`]).
    pub per_priority: [usize; 4],
    /// When the queue was created.
    pub started_at: Instant,
}

impl QueueStatistics {
    pub(crate) fn new() -> Self {
        Self {
            enqueued: 0,
            dequeued: 0,
            rejected_full: 0,
            per_priority: [0; 4],
            started_at: Instant::now(),
        }
    }

    /// Wall-clock time since the queue was created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Current total depth across all priority lanes.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.per_priority.iter().sum()
    }

    pub(crate) fn record_enqueue(&mut self, priority: Priority) {
        self.enqueued += 1;
        self.per_priority[priority.lane()] += 1;
    }

    pub(crate) fn record_dequeue(&mut self, priority: Priority) {
        self.dequeued += 1;
        if let Some(count) = self.per_priority.get_mut(priority.lane()) {
            *count = count.saturating_sub(1);
        }
    }

    pub(crate) fn record_rejected_full(&mut self) {
        self.rejected_full += 1;
    }
}

/// Coarse health signal for the priority queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueHealth {
    /// Accepting work normally.
    Healthy,
    /// Depth is above a configured watermark but still accepting work.
    Congested,
    /// Closed; no longer accepting work.
    Closed,
}
