//! In-memory test doubles for the `notifyhub-ports` boundary contracts.
//!
//! These implementations are intended for:
//! - Unit/integration tests of the dispatcher and executor
//! - Deterministic contract tests for the ports layer
//! - Local experimentation without a real platform, transport, or queue

use notifyhub_domain::{Message, SendResult, Target};
use notifyhub_ports::{BoxFuture, LogEvent, LogFields, Logger, PersistedQueueItem, PlatformAdapter, QueueBackend};
use notifyhub_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::collections::VecDeque;
use std::sync::Mutex as SyncMutex;
use std::time::SystemTime;
use tokio::sync::{Mutex, Notify};

/// A [`Logger`] that captures every event it receives, for assertions in
/// tests. Distinct from `notifyhub-adapters`' `NoopLogger`/`TracingLogger`:
/// those are production collaborators, this one exists only to be inspected.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    base_fields: LogFields,
    events: SyncMutex<Vec<LogEvent>>,
}

impl RecordingLogger {
    /// Build a recording logger with no base fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a snapshot of every event logged so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// Clear recorded events.
    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clear();
    }
}

impl Logger for RecordingLogger {
    fn log(&self, event: LogEvent) {
        self.events.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(event);
    }

    fn child(&self, fields: LogFields) -> Box<dyn Logger> {
        let mut base_fields = self.base_fields.clone();
        base_fields.extend(fields);
        Box::new(Self { base_fields, events: SyncMutex::new(Vec::new()) })
    }
}

/// Scripted outcome for one [`MockPlatformAdapter::send`] call.
#[derive(Debug, Clone)]
pub enum MockSendOutcome {
    /// Every target in the call succeeds.
    AllSucceed,
    /// Every target in the call fails with `error`.
    AllFail {
        /// Error message attached to each failed [`SendResult`].
        error: String,
    },
    /// The adapter itself is unable to attempt delivery (outer `Err`).
    AdapterError {
        /// Error message carried by the returned envelope.
        error: String,
        /// Whether the error is retriable.
        retriable: bool,
    },
}

/// A one-shot call recorded by [`MockPlatformAdapter`].
#[derive(Debug, Clone)]
pub struct RecordedSend {
    /// The message that was sent.
    pub message: Message,
    /// The targets passed to this call.
    pub targets: Vec<Target>,
}

struct MockState {
    outcomes: VecDeque<MockSendOutcome>,
    default_outcome: MockSendOutcome,
    calls: Vec<RecordedSend>,
}

/// A configurable [`PlatformAdapter`] double: `supports_target` matches a
/// fixed platform name, `send` replays a queue of scripted outcomes (falling
/// back to a default once the queue is drained), and every call is recorded
/// for later assertions.
pub struct MockPlatformAdapter {
    name: String,
    state: Mutex<MockState>,
}

impl MockPlatformAdapter {
    /// Build a mock adapter registered under `name`, succeeding by default.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(MockState {
                outcomes: VecDeque::new(),
                default_outcome: MockSendOutcome::AllSucceed,
                calls: Vec::new(),
            }),
        }
    }

    /// Queue one outcome for the next call to `send`, consumed in FIFO order.
    pub async fn push_outcome(&self, outcome: MockSendOutcome) {
        self.state.lock().await.outcomes.push_back(outcome);
    }

    /// Set the outcome returned once the scripted queue is exhausted.
    pub async fn set_default_outcome(&self, outcome: MockSendOutcome) {
        self.state.lock().await.default_outcome = outcome;
    }

    /// Return every call recorded so far, in call order.
    pub async fn calls(&self) -> Vec<RecordedSend> {
        self.state.lock().await.calls.clone()
    }

    /// Number of `send` calls made so far.
    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls.len()
    }
}

impl PlatformAdapter for MockPlatformAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn send<'a>(&'a self, ctx: &'a RequestContext, message: &'a Message, targets: &'a [Target]) -> BoxFuture<'a, Result<Vec<SendResult>>> {
        Box::pin(async move {
            ctx.ensure_not_cancelled("mock_platform_adapter.send")?;

            let mut state = self.state.lock().await;
            state.calls.push(RecordedSend { message: message.clone(), targets: targets.to_vec() });
            let outcome = state.outcomes.pop_front().unwrap_or_else(|| state.default_outcome.clone());
            drop(state);

            match outcome {
                MockSendOutcome::AllSucceed => {
                    let started_at = SystemTime::now();
                    Ok(targets
                        .iter()
                        .map(|target| SendResult::success(target.clone(), &self.name, started_at, std::time::Duration::ZERO, 1))
                        .collect())
                },
                MockSendOutcome::AllFail { error } => {
                    let started_at = SystemTime::now();
                    Ok(targets
                        .iter()
                        .map(|target| SendResult::failure(target.clone(), &self.name, error.clone(), started_at, std::time::Duration::ZERO, 1))
                        .collect())
                },
                MockSendOutcome::AdapterError { error, retriable } => {
                    let class = if retriable { ErrorClass::Retriable } else { ErrorClass::NonRetriable };
                    Err(ErrorEnvelope::unexpected(ErrorCode::adapter(), error, class))
                },
            }
        })
    }

    fn supports_target(&self, target: &Target) -> bool {
        target.platform == self.name
    }

    fn health<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("mock_platform_adapter.health")?;
            Ok(())
        })
    }

    fn shutdown<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("mock_platform_adapter.shutdown")?;
            Ok(())
        })
    }
}

struct QueueState {
    items: VecDeque<PersistedQueueItem>,
    closed: bool,
}

/// An in-memory [`QueueBackend`] double, standing in for an external,
/// possibly durable queue in tests. Items are held in process memory only;
/// nothing survives a restart, matching the in-memory core's own Non-goal
/// around durable persistence (an optional capacity models the "full" case
/// a real backend would enforce).
pub struct InMemoryQueueBackend {
    capacity: Option<usize>,
    state: Mutex<QueueState>,
    item_available: Notify,
}

impl InMemoryQueueBackend {
    /// Build an unbounded in-memory queue backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            capacity: None,
            state: Mutex::new(QueueState { items: VecDeque::new(), closed: false }),
            item_available: Notify::new(),
        }
    }

    /// Build an in-memory queue backend that rejects enqueues once `capacity`
    /// items are held, to exercise the "full" error path.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            state: Mutex::new(QueueState { items: VecDeque::new(), closed: false }),
            item_available: Notify::new(),
        }
    }
}

impl Default for InMemoryQueueBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueBackend for InMemoryQueueBackend {
    fn enqueue<'a>(&'a self, ctx: &'a RequestContext, item: PersistedQueueItem) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            ctx.ensure_not_cancelled("in_memory_queue_backend.enqueue")?;
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(ErrorEnvelope::expected(ErrorCode::queue_closed(), "queue is closed"));
            }
            if let Some(capacity) = self.capacity {
                if state.items.len() >= capacity {
                    return Err(ErrorEnvelope::expected(ErrorCode::queue_full(), "queue is full"));
                }
            }
            state.items.push_back(item);
            drop(state);
            self.item_available.notify_one();
            Ok(())
        })
    }

    fn dequeue<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<PersistedQueueItem>> {
        Box::pin(async move {
            ctx.ensure_not_cancelled("in_memory_queue_backend.dequeue")?;
            loop {
                {
                    let mut state = self.state.lock().await;
                    if let Some(item) = state.items.pop_front() {
                        return Ok(item);
                    }
                    if state.closed {
                        return Err(ErrorEnvelope::expected(ErrorCode::queue_closed(), "queue is closed"));
                    }
                }
                tokio::select! {
                    () = ctx.cancelled() => {
                        return Err(ErrorEnvelope::cancelled("operation cancelled").with_metadata("operation", "in_memory_queue_backend.dequeue"));
                    }
                    () = self.item_available.notified() => {}
                }
            }
        })
    }

    fn size<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<usize>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("in_memory_queue_backend.size")?;
            Ok(self.state.lock().await.items.len())
        })
    }

    fn close<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("in_memory_queue_backend.close")?;
            let mut state = self.state.lock().await;
            state.closed = true;
            drop(state);
            self.item_available.notify_waiters();
            Ok(())
        })
    }
}

/// Build a simple, valid [`Target`] fixture for tests.
#[must_use]
pub fn target_fixture(platform: &str) -> Target {
    Target::builder("email", format!("user@{platform}.example"), platform)
        .build()
        .unwrap_or_else(|_| unreachable!("fixture inputs are always valid"))
}

/// Build a simple, valid [`Message`] fixture addressed to one target on
/// `platform`.
#[must_use]
pub fn message_fixture(platform: &str) -> Message {
    Message::builder("test title", "test body")
        .target(target_fixture(platform))
        .build()
        .unwrap_or_else(|_| unreachable!("fixture inputs are always valid"))
}
