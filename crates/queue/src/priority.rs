//! Bounded, priority-ordered, blocking in-memory queue.

use crate::error::QueueError;
use crate::stats::{QueueHealth, QueueStatistics};
use notifyhub_domain::Priority;
use notifyhub_shared::CancellationToken;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

/// Default queue capacity when none is configured.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Items carried by the priority queue must expose their priority lane.
pub trait Prioritized {
    /// The priority used to select the queue lane.
    fn priority(&self) -> Priority;
}

struct QueueState<T> {
    lanes: [VecDeque<T>; 4],
    closed: bool,
    stats: QueueStatistics,
    congestion_watermark: usize,
}

impl<T> QueueState<T> {
    fn depth(&self) -> usize {
        self.lanes.iter().map(VecDeque::len).sum()
    }

    fn pop_highest(&mut self) -> Option<T> {
        for lane in self.lanes.iter_mut().rev() {
            if let Some(item) = lane.pop_front() {
                return Some(item);
            }
        }
        None
    }

    fn drain_all(&mut self) -> Vec<T> {
        let mut drained = Vec::with_capacity(self.depth());
        for lane in self.lanes.iter_mut().rev() {
            drained.extend(lane.drain(..));
        }
        drained
    }
}

/// In-memory, priority-ordered, capacity-bounded blocking queue.
///
/// Backed by a mutex guarding four FIFO lanes (one per [`Priority`] tier) and
/// a `Notify` used the same way the shared crate's `CancellationToken` wakes
/// waiters: `notify_one` on every successful enqueue, `notify_waiters` (a
/// broadcast wake) on close.
pub struct PriorityQueue<T> {
    capacity: usize,
    state: Arc<Mutex<QueueState<T>>>,
    notify: Arc<Notify>,
}

impl<T> Clone for PriorityQueue<T> {
    fn clone(&self) -> Self {
        Self {
            capacity: self.capacity,
            state: Arc::clone(&self.state),
            notify: Arc::clone(&self.notify),
        }
    }
}

impl<T: Prioritized> PriorityQueue<T> {
    /// Create a queue with the given capacity (applies across all priority lanes combined).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_congestion_watermark(capacity, capacity)
    }

    /// Create a queue that reports [`QueueHealth::Congested`] once depth crosses `watermark`.
    #[must_use]
    pub fn with_congestion_watermark(capacity: usize, watermark: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Arc::new(Mutex::new(QueueState {
                lanes: [VecDeque::new(), VecDeque::new(), VecDeque::new(), VecDeque::new()],
                closed: false,
                stats: QueueStatistics::new(),
                congestion_watermark: watermark,
            })),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert one item, failing if the queue is closed or at capacity.
    ///
    /// # Errors
    /// Returns [`QueueError::Closed`] or [`QueueError::Full`].
    pub async fn enqueue(&self, item: T) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(QueueError::Closed);
        }
        if state.depth() >= self.capacity {
            state.stats.record_rejected_full();
            return Err(QueueError::Full);
        }
        let priority = item.priority();
        state.lanes[priority.lane()].push_back(item);
        state.stats.record_enqueue(priority);
        drop(state);
        self.notify.notify_one();
        Ok(())
    }

    /// Insert a batch of items atomically: either all are admitted or none are.
    ///
    /// # Errors
    /// Returns [`QueueError::Closed`] or [`QueueError::Full`] without admitting any item.
    pub async fn enqueue_batch(&self, items: Vec<T>) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(QueueError::Closed);
        }
        if state.depth() + items.len() > self.capacity {
            state.stats.record_rejected_full();
            return Err(QueueError::Full);
        }
        let count = items.len();
        for item in items {
            let priority = item.priority();
            state.lanes[priority.lane()].push_back(item);
            state.stats.record_enqueue(priority);
        }
        drop(state);
        for _ in 0..count {
            self.notify.notify_one();
        }
        Ok(())
    }

    /// Block until an item is available, the queue closes and drains, or `cancel` fires.
    ///
    /// # Errors
    /// Returns [`QueueError::ClosedEmpty`] once the queue is closed with nothing left, or
    /// [`QueueError::Cancelled`] if the token fires first.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Result<T, QueueError> {
        loop {
            let notified = {
                let mut state = self.state.lock().await;
                if let Some(item) = state.pop_highest() {
                    let priority = item.priority();
                    state.stats.record_dequeue(priority);
                    return Ok(item);
                }
                if state.closed {
                    return Err(QueueError::ClosedEmpty);
                }
                self.notify.notified()
            };

            tokio::select! {
                () = cancel.cancelled() => return Err(QueueError::Cancelled),
                () = notified => {},
            }
        }
    }

    /// Non-blocking: remove and return up to `max` items, highest priority first.
    pub async fn dequeue_batch(&self, max: usize) -> Vec<T> {
        let mut state = self.state.lock().await;
        let mut out = Vec::with_capacity(max.min(state.depth()));
        while out.len() < max {
            match state.pop_highest() {
                Some(item) => {
                    let priority = item.priority();
                    state.stats.record_dequeue(priority);
                    out.push(item);
                },
                None => break,
            }
        }
        out
    }

    /// Current total depth across all priority lanes.
    pub async fn size(&self) -> usize {
        self.state.lock().await.depth()
    }

    /// True when no items are queued.
    pub async fn is_empty(&self) -> bool {
        self.size().await == 0
    }

    /// Coarse health signal based on depth relative to the congestion watermark.
    pub async fn health(&self) -> QueueHealth {
        let state = self.state.lock().await;
        if state.closed {
            QueueHealth::Closed
        } else if state.depth() >= state.congestion_watermark {
            QueueHealth::Congested
        } else {
            QueueHealth::Healthy
        }
    }

    /// Snapshot of queue counters.
    pub async fn statistics(&self) -> QueueStatistics {
        self.state.lock().await.stats
    }

    /// Idempotently close the queue, waking every blocked `dequeue` and draining
    /// whatever remains so the caller can cancel the corresponding handles.
    pub async fn close(&self) -> Vec<T> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Vec::new();
        }
        state.closed = true;
        let drained = state.drain_all();
        drop(state);
        self.notify.notify_waiters();
        drained
    }

    /// True once [`PriorityQueue::close`] has run.
    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Item(u32, Priority);

    impl Prioritized for Item {
        fn priority(&self) -> Priority {
            self.1
        }
    }

    #[tokio::test]
    async fn dequeue_returns_highest_priority_first() {
        let queue: PriorityQueue<Item> = PriorityQueue::new(10);
        queue.enqueue(Item(1, Priority::Low)).await.expect("enqueue");
        queue.enqueue(Item(2, Priority::Urgent)).await.expect("enqueue");
        queue.enqueue(Item(3, Priority::Normal)).await.expect("enqueue");

        let cancel = CancellationToken::new();
        let first = queue.dequeue(&cancel).await.expect("dequeue");
        assert_eq!(first.0, 2);
        let second = queue.dequeue(&cancel).await.expect("dequeue");
        assert_eq!(second.0, 3);
    }

    #[tokio::test]
    async fn fifo_within_same_priority() {
        let queue: PriorityQueue<Item> = PriorityQueue::new(10);
        queue.enqueue(Item(1, Priority::Normal)).await.expect("enqueue");
        queue.enqueue(Item(2, Priority::Normal)).await.expect("enqueue");

        let cancel = CancellationToken::new();
        assert_eq!(queue.dequeue(&cancel).await.expect("dequeue").0, 1);
        assert_eq!(queue.dequeue(&cancel).await.expect("dequeue").0, 2);
    }

    #[tokio::test]
    async fn enqueue_rejects_when_full() {
        let queue: PriorityQueue<Item> = PriorityQueue::new(1);
        queue.enqueue(Item(1, Priority::Low)).await.expect("enqueue");
        let result = queue.enqueue(Item(2, Priority::Low)).await;
        assert_eq!(result, Err(QueueError::Full));
    }

    #[tokio::test]
    async fn enqueue_batch_is_all_or_nothing() {
        let queue: PriorityQueue<Item> = PriorityQueue::new(2);
        let items = vec![Item(1, Priority::Low), Item(2, Priority::Low), Item(3, Priority::Low)];
        let result = queue.enqueue_batch(items).await;
        assert_eq!(result, Err(QueueError::Full));
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn close_drains_and_wakes_waiters() {
        let queue: PriorityQueue<Item> = PriorityQueue::new(10);
        queue.enqueue(Item(1, Priority::Low)).await.expect("enqueue");

        let drained = queue.close().await;
        assert_eq!(drained.len(), 1);

        let cancel = CancellationToken::new();
        let result = queue.dequeue(&cancel).await;
        assert_eq!(result, Err(QueueError::ClosedEmpty));
    }

    fn priority_from_tag(tag: u8) -> Priority {
        match tag % 4 {
            0 => Priority::Low,
            1 => Priority::Normal,
            2 => Priority::High,
            _ => Priority::Urgent,
        }
    }

    proptest::proptest! {
        /// For any sequence of (tag, priority) pairs enqueued in order, draining
        /// the queue yields items in non-increasing priority order, and items
        /// sharing a priority come out in their original relative order
        /// (`spec.md` §8: "higher priority precedes lower; FIFO within a tier").
        #[test]
        fn dequeue_order_is_priority_then_fifo(tags in proptest::collection::vec(0u8..4, 0..64)) {
            let runtime = tokio::runtime::Runtime::new().expect("runtime");
            runtime.block_on(async move {
                let queue: PriorityQueue<Item> = PriorityQueue::new(tags.len().max(1));
                for (index, tag) in tags.iter().enumerate() {
                    queue
                        .enqueue(Item(index as u32, priority_from_tag(*tag)))
                        .await
                        .expect("capacity sized to input");
                }

                let cancel = CancellationToken::new();
                let mut drained = Vec::with_capacity(tags.len());
                while !queue.is_empty().await {
                    drained.push(queue.dequeue(&cancel).await.expect("dequeue"));
                }

                for window in drained.windows(2) {
                    let (a, b) = (&window[0], &window[1]);
                    prop_assert!(a.1 >= b.1, "priority must be non-increasing across dequeues");
                    if a.1 == b.1 {
                        prop_assert!(a.0 < b.0, "same-priority items must preserve FIFO order");
                    }
                }
                Ok(())
            })?;
        }
    }

    #[tokio::test]
    async fn dequeue_wakes_on_cancellation() {
        let queue: PriorityQueue<Item> = PriorityQueue::new(10);
        let queue2 = queue.clone();
        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();

        let waiter = tokio::spawn(async move { queue2.dequeue(&cancel2).await });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cancel.cancel();
        let result = waiter.await.expect("join");
        assert_eq!(result, Err(QueueError::Cancelled));
    }
}
