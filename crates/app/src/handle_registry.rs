//! Bounded lookup table of in-flight and recently-terminal [`Handle`]s.
//!
//! Exists so operational tooling (stats endpoints, admin commands) can find
//! a handle by message id without the caller having kept its own reference.

use crate::handle::Handle;
use notifyhub_domain::MessageId;
use notifyhub_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;

/// Default capacity of the handle registry.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Default time-to-live for a terminal handle before it is garbage collected.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Bounded `MessageId -> Arc<Handle>` registry with TTL-based garbage
/// collection of terminal entries.
pub struct HandleRegistry {
    capacity: usize,
    ttl: Duration,
    entries: Mutex<HashMap<MessageId, Arc<Handle>>>,
}

impl HandleRegistry {
    /// Create a registry with the given capacity and terminal-entry TTL.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register a handle.
    ///
    /// # Errors
    /// Returns a `capacity_exceeded` error if the registry is full and
    /// garbage collection does not free enough room.
    pub async fn register(&self, handle: Arc<Handle>) -> Result<(), ErrorEnvelope> {
        let mut entries = self.entries.lock().await;
        if entries.len() >= self.capacity {
            collect_expired(&mut entries, self.ttl);
        }
        if entries.len() >= self.capacity {
            return Err(ErrorEnvelope::expected_with_class(
                ErrorCode::capacity_exceeded(),
                "handle registry is at capacity",
                ErrorClass::Retriable,
            ));
        }
        entries.insert(handle.message_id().clone(), handle);
        Ok(())
    }

    /// Look up a handle by message id.
    pub async fn get(&self, message_id: &MessageId) -> Option<Arc<Handle>> {
        self.entries.lock().await.get(message_id).cloned()
    }

    /// Remove a handle explicitly (e.g. after the caller drops interest).
    pub async fn remove(&self, message_id: &MessageId) -> Option<Arc<Handle>> {
        self.entries.lock().await.remove(message_id)
    }

    /// Number of entries currently tracked.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// True when no entries are tracked.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Sweep terminal entries older than the configured TTL.
    pub async fn collect_garbage(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        collect_expired(&mut entries, self.ttl);
        before - entries.len()
    }
}

fn collect_expired(entries: &mut HashMap<MessageId, Arc<Handle>>, ttl: Duration) {
    let now = SystemTime::now();
    entries.retain(|_, handle| {
        let snapshot = handle.status();
        if !snapshot.state.is_terminal() {
            return true;
        }
        now.duration_since(snapshot.updated_at)
            .map(|age| age < ttl)
            .unwrap_or(true)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_rejects_when_full() {
        let registry = HandleRegistry::new(1, DEFAULT_TTL);
        let first = Arc::new(Handle::new(MessageId::generate()));
        registry.register(first).await.expect("first register");

        let second = Arc::new(Handle::new(MessageId::generate()));
        let result = registry.register(second).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn garbage_collection_frees_expired_terminal_entries() {
        let registry = HandleRegistry::new(1, Duration::from_millis(1));
        let handle = Arc::new(Handle::new(MessageId::generate()));
        handle.cancel().expect("cancel pending handle");
        registry.register(Arc::clone(&handle)).await.expect("register");

        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = Arc::new(Handle::new(MessageId::generate()));
        registry.register(second).await.expect("register after gc frees room");
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn get_and_remove_round_trip() {
        let registry = HandleRegistry::new(DEFAULT_CAPACITY, DEFAULT_TTL);
        let id = MessageId::generate();
        let handle = Arc::new(Handle::new(id.clone()));
        registry.register(Arc::clone(&handle)).await.expect("register");
        assert!(registry.get(&id).await.is_some());
        registry.remove(&id).await;
        assert!(registry.get(&id).await.is_none());
    }
}
