//! Min-heap of future-scheduled items, promoted into a [`PriorityQueue`] when due.

use crate::error::QueueError;
use crate::priority::{Prioritized, PriorityQueue};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

/// How often the scheduler ticker checks the heap head for due items.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// How long a promotion attempt waits for queue capacity before giving up.
pub const DEFAULT_PROMOTION_TIMEOUT: Duration = Duration::from_millis(500);

/// Delayed items must expose the time they become eligible for promotion and
/// a stable key so they can be located for cancellation.
pub trait Scheduled {
    /// Stable key identifying this item (typically the owning message id).
    type Key: PartialEq + Clone;

    /// When this item becomes eligible for promotion into the priority queue.
    fn scheduled_at(&self) -> SystemTime;

    /// The item's stable key.
    fn key(&self) -> Self::Key;
}

struct HeapEntry<T>(T);

impl<T: Scheduled> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.scheduled_at() == other.0.scheduled_at()
    }
}
impl<T: Scheduled> Eq for HeapEntry<T> {}
impl<T: Scheduled> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: Scheduled> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.scheduled_at().cmp(&other.0.scheduled_at())
    }
}

/// Min-heap of items awaiting a future delivery time.
///
/// A dedicated background task ticks on an interval, peeks the heap head, and
/// promotes any due items into the paired [`PriorityQueue`].
pub struct DelayScheduler<T: Scheduled + Prioritized + Send + 'static> {
    heap: Arc<Mutex<BinaryHeap<Reverse<HeapEntry<T>>>>>,
    queue: PriorityQueue<T>,
    ticker: Option<JoinHandle<()>>,
}

impl<T: Scheduled + Prioritized + Send + 'static> DelayScheduler<T> {
    /// Create a scheduler that promotes due items into `queue`.
    #[must_use]
    pub fn new(queue: PriorityQueue<T>) -> Self {
        Self {
            heap: Arc::new(Mutex::new(BinaryHeap::new())),
            queue,
            ticker: None,
        }
    }

    /// Insert an item. If `scheduled_at()` is not in the future, delegates directly
    /// to the underlying queue's `enqueue`.
    ///
    /// # Errors
    /// Propagates [`QueueError`] from the underlying queue when delegating immediately.
    pub async fn enqueue_delayed(&self, item: T) -> Result<(), QueueError> {
        if item.scheduled_at() <= SystemTime::now() {
            return self.queue.enqueue(item).await;
        }
        self.heap.lock().await.push(Reverse(HeapEntry(item)));
        Ok(())
    }

    /// Insert a batch of delayed items; each is evaluated independently against `now`.
    ///
    /// # Errors
    /// Propagates [`QueueError`] from the underlying queue for any item delegated immediately.
    pub async fn enqueue_batch_delayed(&self, items: Vec<T>) -> Result<(), QueueError> {
        for item in items {
            self.enqueue_delayed(item).await?;
        }
        Ok(())
    }

    /// Remove the item matching `key` from the heap, if present.
    ///
    /// Returns the removed item so the caller can mark its handle cancelled.
    pub async fn cancel_scheduled(&self, key: &T::Key) -> Option<T> {
        let mut heap = self.heap.lock().await;
        let items: Vec<_> = heap.drain().collect();
        let mut removed = None;
        let mut kept = BinaryHeap::with_capacity(items.len());
        for Reverse(HeapEntry(item)) in items {
            if removed.is_none() && &item.key() == key {
                removed = Some(item);
            } else {
                kept.push(Reverse(HeapEntry(item)));
            }
        }
        *heap = kept;
        removed
    }

    /// Peek the next item due for promotion, without removing it.
    pub async fn peek_next(&self) -> Option<SystemTime> {
        self.heap.lock().await.peek().map(|Reverse(HeapEntry(item))| item.scheduled_at())
    }

    /// Number of items currently held in the heap.
    pub async fn scheduled_count(&self) -> usize {
        self.heap.lock().await.len()
    }

    /// Spawn the ticker task that promotes due items into the priority queue.
    ///
    /// Idempotent: calling this again while a ticker is already running is a no-op.
    pub fn start(&mut self, tick_interval: Duration, promotion_timeout: Duration) {
        if self.ticker.is_some() {
            return;
        }
        let heap = Arc::clone(&self.heap);
        let queue = self.queue.clone();
        self.ticker = Some(tokio::spawn(async move {
            tick_loop(heap, queue, tick_interval, promotion_timeout).await;
        }));
    }

    /// Stop the ticker task, if running.
    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    /// Idempotent: stop the ticker and drain every item still waiting in the
    /// heap, returning them so the caller can cancel their handles (mirrors
    /// [`PriorityQueue::close`], which does the same for items already past
    /// the delay stage).
    pub async fn close(&mut self) -> Vec<T> {
        self.stop();
        let mut heap = self.heap.lock().await;
        heap.drain().map(|Reverse(HeapEntry(item))| item).collect()
    }
}

impl<T: Scheduled + Prioritized + Send + 'static> Drop for DelayScheduler<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn tick_loop<T: Scheduled + Prioritized + Send + 'static>(
    heap: Arc<Mutex<BinaryHeap<Reverse<HeapEntry<T>>>>>,
    queue: PriorityQueue<T>,
    tick_interval: Duration,
    promotion_timeout: Duration,
) {
    let mut interval = tokio::time::interval(tick_interval);
    loop {
        interval.tick().await;
        let now = SystemTime::now();
        loop {
            let due = {
                let mut guard = heap.lock().await;
                match guard.peek() {
                    Some(Reverse(HeapEntry(item))) if item.scheduled_at() <= now => {
                        guard.pop().map(|Reverse(HeapEntry(item))| item)
                    },
                    _ => None,
                }
            };
            let Some(item) = due else {
                break;
            };
            let promotion = tokio::time::timeout(promotion_timeout, queue.enqueue(item));
            match promotion.await {
                Ok(Ok(())) => {},
                Ok(Err(error)) => {
                    warn!(error = %error, "delay scheduler failed to promote due item");
                },
                Err(_) => {
                    warn!("delay scheduler promotion timed out");
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifyhub_domain::Priority;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Item {
        id: u32,
        at: SystemTime,
    }

    impl Scheduled for Item {
        type Key = u32;

        fn scheduled_at(&self) -> SystemTime {
            self.at
        }

        fn key(&self) -> Self::Key {
            self.id
        }
    }

    impl Prioritized for Item {
        fn priority(&self) -> Priority {
            Priority::Normal
        }
    }

    #[tokio::test]
    async fn past_schedule_delegates_immediately() {
        let queue: PriorityQueue<Item> = PriorityQueue::new(10);
        let scheduler = DelayScheduler::new(queue.clone());
        let item = Item { id: 1, at: SystemTime::now() - Duration::from_secs(1) };
        scheduler.enqueue_delayed(item).await.expect("enqueue");
        assert_eq!(queue.size().await, 1);
        assert_eq!(scheduler.scheduled_count().await, 0);
    }

    #[tokio::test]
    async fn future_schedule_holds_in_heap() {
        let queue: PriorityQueue<Item> = PriorityQueue::new(10);
        let scheduler = DelayScheduler::new(queue.clone());
        let item = Item { id: 1, at: SystemTime::now() + Duration::from_secs(60) };
        scheduler.enqueue_delayed(item).await.expect("enqueue");
        assert_eq!(queue.size().await, 0);
        assert_eq!(scheduler.scheduled_count().await, 1);
    }

    #[tokio::test]
    async fn cancel_scheduled_removes_matching_key() {
        let queue: PriorityQueue<Item> = PriorityQueue::new(10);
        let scheduler = DelayScheduler::new(queue.clone());
        scheduler
            .enqueue_delayed(Item { id: 1, at: SystemTime::now() + Duration::from_secs(60) })
            .await
            .expect("enqueue");
        scheduler
            .enqueue_delayed(Item { id: 2, at: SystemTime::now() + Duration::from_secs(60) })
            .await
            .expect("enqueue");

        let removed = scheduler.cancel_scheduled(&1).await;
        assert!(removed.is_some());
        assert_eq!(scheduler.scheduled_count().await, 1);
    }

    #[tokio::test]
    async fn ticker_promotes_due_items() {
        let queue: PriorityQueue<Item> = PriorityQueue::new(10);
        let mut scheduler = DelayScheduler::new(queue.clone());
        scheduler
            .enqueue_delayed(Item { id: 1, at: SystemTime::now() + Duration::from_millis(50) })
            .await
            .expect("enqueue");
        scheduler.start(Duration::from_millis(10), DEFAULT_PROMOTION_TIMEOUT);

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(queue.size().await, 1);
        assert_eq!(scheduler.scheduled_count().await, 0);
    }

    #[tokio::test]
    async fn close_drains_the_heap_and_stops_the_ticker() {
        let queue: PriorityQueue<Item> = PriorityQueue::new(10);
        let mut scheduler = DelayScheduler::new(queue.clone());
        scheduler
            .enqueue_delayed(Item { id: 1, at: SystemTime::now() + Duration::from_secs(60) })
            .await
            .expect("enqueue");
        scheduler
            .enqueue_delayed(Item { id: 2, at: SystemTime::now() + Duration::from_secs(60) })
            .await
            .expect("enqueue");
        scheduler.start(DEFAULT_TICK_INTERVAL, DEFAULT_PROMOTION_TIMEOUT);

        let drained = scheduler.close().await;
        assert_eq!(drained.len(), 2);
        assert_eq!(scheduler.scheduled_count().await, 0);

        // A second close is a no-op, matching `PriorityQueue::close`'s idempotence.
        assert!(scheduler.close().await.is_empty());
    }
}
