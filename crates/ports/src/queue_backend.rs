//! Optional external queue boundary contract.
//!
//! Persistent/durable queueing across restarts is explicitly out of scope
//! for the in-memory core (see the purpose & scope Non-goals); an external
//! queue is modeled as an adapter implementing this same contract rather
//! than a built-in feature.

use crate::BoxFuture;
use notifyhub_domain::{BatchId, MessageId, Priority};
use notifyhub_shared::{RequestContext, Result};
use std::time::SystemTime;

/// A message enqueued through an external [`QueueBackend`], independent of
/// the in-process `Handle` it was submitted with.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedQueueItem {
    /// The originating message id.
    pub message_id: MessageId,
    /// Serialized message payload (adapter-defined encoding).
    pub payload: Vec<u8>,
    /// Delivery priority, preserved across the persistence boundary.
    pub priority: Priority,
    /// When the item was originally queued.
    pub queued_at: SystemTime,
    /// Batch this item belongs to, if any.
    pub batch_id: Option<BatchId>,
}

/// Boundary contract an external, possibly durable, queue must satisfy to
/// stand in for the in-memory priority queue.
pub trait QueueBackend: Send + Sync {
    /// Insert one item; fails the same way the in-memory queue does
    /// (closed/full) when the backend enforces those constraints.
    fn enqueue<'a>(
        &'a self,
        ctx: &'a RequestContext,
        item: PersistedQueueItem,
    ) -> BoxFuture<'a, Result<()>>;

    /// Remove and return the next item, honoring cancellation via `ctx`.
    fn dequeue<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<PersistedQueueItem>>;

    /// Current queue depth.
    fn size<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<usize>>;

    /// Idempotently stop accepting new work.
    fn close<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>>;
}
