//! Handle-ready envelopes carried through the priority queue and delay scheduler.

use crate::handle::Handle;
use notifyhub_domain::{BatchId, Message, MessageId, Priority};
use notifyhub_queue::{Prioritized, Scheduled};
use std::sync::Arc;
use std::time::SystemTime;

/// Back-reference recorded on a [`QueueItem`] that belongs to a batch, so the
/// worker that dispatches it can report progress to the owning
/// [`crate::handle::BatchHandle`] without the queue itself knowing about batches.
#[derive(Debug, Clone)]
pub struct BatchInfo {
    /// The batch this item belongs to.
    pub batch_id: BatchId,
}

/// One unit of work sitting in the priority queue: a message, the handle the
/// caller observes, and (for batch submissions) a back-reference to the batch.
#[derive(Clone)]
pub struct QueueItem {
    /// The message to deliver.
    pub message: Message,
    /// The handle the caller holds for this message.
    pub handle: Arc<Handle>,
    /// When this item was admitted to the priority queue.
    pub queued_at: SystemTime,
    /// Set when this item was submitted as part of a batch.
    pub batch_info: Option<BatchInfo>,
}

impl QueueItem {
    /// Wrap a message and its handle for submission to the queue.
    #[must_use]
    pub fn new(message: Message, handle: Arc<Handle>, batch_info: Option<BatchInfo>) -> Self {
        Self {
            message,
            handle,
            queued_at: SystemTime::now(),
            batch_info,
        }
    }

    /// The message id, convenience over `self.message.id`.
    #[must_use]
    pub fn message_id(&self) -> MessageId {
        self.message.id.clone()
    }
}

impl Prioritized for QueueItem {
    fn priority(&self) -> Priority {
        self.message.priority
    }
}

/// A [`QueueItem`] still waiting on its `scheduled_at` time, held in the
/// delay scheduler's min-heap.
#[derive(Clone)]
pub struct DelayedItem {
    /// The wrapped item, ready to promote once due.
    pub item: QueueItem,
    /// The time at which this item becomes eligible for promotion.
    pub scheduled_at: SystemTime,
}

impl DelayedItem {
    /// Wrap a queue item with its scheduled promotion time.
    #[must_use]
    pub fn new(item: QueueItem, scheduled_at: SystemTime) -> Self {
        Self { item, scheduled_at }
    }
}

impl Prioritized for DelayedItem {
    fn priority(&self) -> Priority {
        self.item.priority()
    }
}

impl Scheduled for DelayedItem {
    type Key = MessageId;

    fn scheduled_at(&self) -> SystemTime {
        self.scheduled_at
    }

    fn key(&self) -> Self::Key {
        self.item.message_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Handle;
    use notifyhub_domain::Target;

    fn message() -> Message {
        Message::builder("hi", "there")
            .target(
                Target::builder("email", "a@example.com", "smtp")
                    .build()
                    .expect("valid target"),
            )
            .priority(Priority::High)
            .build()
            .expect("valid message")
    }

    #[test]
    fn queue_item_priority_mirrors_message() {
        let message = message();
        let handle = Arc::new(Handle::new(message.id.clone()));
        let item = QueueItem::new(message, handle, None);
        assert_eq!(item.priority(), Priority::High);
    }

    #[test]
    fn delayed_item_key_is_message_id() {
        let message = message();
        let id = message.id.clone();
        let handle = Arc::new(Handle::new(id.clone()));
        let item = QueueItem::new(message, handle, None);
        let delayed = DelayedItem::new(item, SystemTime::now());
        assert_eq!(delayed.key(), id);
    }
}
