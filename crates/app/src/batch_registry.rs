//! Lookup table from [`BatchId`] to its [`BatchHandle`], so a worker handling
//! one child of a batch can find the batch to report progress against
//! without the [`crate::queue_item::QueueItem`] owning a reference cycle.

use crate::handle::BatchHandle;
use notifyhub_domain::BatchId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Bounded `BatchId -> Arc<BatchHandle>` table.
pub struct BatchRegistry {
    entries: Mutex<HashMap<BatchId, Arc<BatchHandle>>>,
}

impl BatchRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register a batch handle.
    pub async fn register(&self, batch: Arc<BatchHandle>) {
        self.entries.lock().await.insert(batch.batch_id().clone(), batch);
    }

    /// Look up a batch handle by id.
    pub async fn get(&self, batch_id: &BatchId) -> Option<Arc<BatchHandle>> {
        self.entries.lock().await.get(batch_id).cloned()
    }

    /// Remove a batch once it has reached its terminal state.
    pub async fn remove(&self, batch_id: &BatchId) -> Option<Arc<BatchHandle>> {
        self.entries.lock().await.remove(batch_id)
    }

    /// Number of batches currently tracked.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

impl Default for BatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
