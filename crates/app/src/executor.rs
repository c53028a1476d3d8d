//! The async executor: the single composition root callers go through to
//! schedule messages and batches. Owns the priority queue, an optional delay
//! scheduler wrapping it, the callback registry, and the elastic worker pool
//! draining it all through a [`Dispatcher`].

use crate::batch_registry::BatchRegistry;
use crate::callback_registry::{CallbackRegistry, CallbackRegistryConfig, CallbackRegistryStats, CallbackRetryPolicy, CallbackSet};
use crate::dispatcher::Dispatcher;
use crate::handle::{BatchHandle, Handle};
use crate::handle_registry::{HandleRegistry, DEFAULT_CAPACITY as DEFAULT_HANDLE_CAPACITY, DEFAULT_TTL as DEFAULT_HANDLE_TTL};
use crate::queue_item::{BatchInfo, DelayedItem, QueueItem};
use crate::worker_pool::{LoadBalancerStrategy, TimeoutExceeded, WorkerPool, WorkerPoolConfig, WorkerStats};
use notifyhub_domain::{BatchId, Message, Priority};
use notifyhub_queue::{PriorityQueue, QueueStatistics};
use notifyhub_queue::{DelayScheduler, DEFAULT_PROMOTION_TIMEOUT, DEFAULT_TICK_INTERVAL};
use notifyhub_shared::{CancellationToken, ErrorCode, ErrorEnvelope, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

/// Bounded default capacity of the queue/delay-scheduler pair.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Per-call overrides layered on top of [`AsyncExecutor`]'s defaults.
///
/// Mirrors a message's own fields rather than introducing a parallel
/// "options bag" type per call site: a priority override, a soft timeout
/// applied by the caller's own [`Handle::wait`], a retry-policy override for
/// this message/batch's callbacks, a callback set to register before the
/// item is admitted to the queue, and metadata merged into the message.
#[derive(Clone, Default)]
pub struct AsyncOption {
    /// Overrides `message.priority` if set.
    pub priority_override: Option<Priority>,
    /// Soft timeout a caller may apply when waiting on the returned handle;
    /// not enforced by the executor itself (see [`Handle::wait`]).
    pub timeout: Option<Duration>,
    /// Overrides the default callback retry policy for this message/batch's
    /// registered callbacks.
    pub retry_policy: Option<CallbackRetryPolicy>,
    /// Callbacks registered for this message/batch id before admission.
    pub callbacks: Option<CallbackSet>,
    /// Extra metadata merged into the message before validation... the
    /// message is already validated by the time it reaches here, so these
    /// are merged as-is without re-validation.
    pub metadata: Vec<(String, String)>,
}

/// Tuning knobs for [`AsyncExecutor::new`].
#[derive(Clone)]
pub struct ExecutorConfig {
    /// Capacity of both the immediate queue and the delay-scheduler's
    /// promotion queue.
    pub queue_capacity: usize,
    /// Worker pool configuration.
    pub worker_pool: WorkerPoolConfig,
    /// Callback registry configuration.
    pub callback_registry: CallbackRegistryConfig,
    /// Load balancing strategy used to route drained batches to workers.
    pub load_balancer: LoadBalancerStrategy,
    /// Capacity of the handle registry.
    pub handle_capacity: usize,
    /// Terminal handle TTL before garbage collection.
    pub handle_ttl: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            worker_pool: WorkerPoolConfig::default(),
            callback_registry: CallbackRegistryConfig::default(),
            load_balancer: LoadBalancerStrategy::LeastConnections,
            handle_capacity: DEFAULT_HANDLE_CAPACITY,
            handle_ttl: DEFAULT_HANDLE_TTL,
        }
    }
}

/// Combined operational snapshot across every subsystem the executor owns.
#[derive(Debug, Clone)]
pub struct ExecutorStats {
    /// Wall-clock time since [`AsyncExecutor::start`] was called.
    pub since_started: Duration,
    /// True if any owned subsystem reports itself unhealthy.
    pub degraded: bool,
    /// True only when every owned subsystem reports healthy.
    pub healthy: bool,
    /// Immediate-queue counters.
    pub queue: QueueStatistics,
    /// Delay-scheduler items still waiting on their `scheduled_at` time.
    pub delayed_count: usize,
    /// Per-worker snapshots.
    pub workers: Vec<WorkerStats>,
    /// Callback registry counters.
    pub callbacks: CallbackRegistryStats,
    /// Handles currently tracked by the handle registry.
    pub handles_tracked: usize,
}

/// Composition root: queue, delay scheduler, callback registry, and worker
/// pool, wired together behind a single `ScheduleAsync`/`ScheduleBatch` API.
pub struct AsyncExecutor {
    queue: PriorityQueue<QueueItem>,
    delay_promotion_queue: PriorityQueue<DelayedItem>,
    delay_scheduler: Mutex<DelayScheduler<DelayedItem>>,
    bridge_task: Mutex<Option<JoinHandle<()>>>,
    callbacks: Arc<CallbackRegistry>,
    batches: Arc<BatchRegistry>,
    handles: Arc<HandleRegistry>,
    pool: Arc<WorkerPool>,
    cancel: CancellationToken,
    started: AtomicBool,
    started_at: Mutex<Option<Instant>>,
}

impl AsyncExecutor {
    /// Build an executor around `dispatcher`. Call [`AsyncExecutor::start`]
    /// to boot the worker pool, delay scheduler, and delayed-item bridge.
    #[must_use]
    pub fn new(config: ExecutorConfig, dispatcher: Arc<dyn Dispatcher>) -> Self {
        let queue: PriorityQueue<QueueItem> = PriorityQueue::new(config.queue_capacity);
        let delay_promotion_queue: PriorityQueue<DelayedItem> = PriorityQueue::new(config.queue_capacity);
        let callbacks = Arc::new(CallbackRegistry::new(config.callback_registry));
        let batches = Arc::new(BatchRegistry::new());
        let handles = Arc::new(HandleRegistry::new(config.handle_capacity, config.handle_ttl));

        let pool = Arc::new(WorkerPool::new(
            config.worker_pool,
            queue.clone(),
            dispatcher,
            Arc::clone(&callbacks),
            Arc::clone(&batches),
            config.load_balancer,
        ));

        let delay_scheduler = DelayScheduler::new(delay_promotion_queue.clone());

        Self {
            queue,
            delay_promotion_queue,
            delay_scheduler: Mutex::new(delay_scheduler),
            bridge_task: Mutex::new(None),
            callbacks,
            batches,
            handles,
            pool,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            started_at: Mutex::new(None),
        }
    }

    /// Start the worker pool, the delay scheduler's promotion ticker, and the
    /// bridge task that moves promoted items into the immediate queue.
    /// Idempotent.
    pub async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.started_at.lock().await = Some(Instant::now());
        self.pool.start().await;
        self.delay_scheduler.lock().await.start(DEFAULT_TICK_INTERVAL, DEFAULT_PROMOTION_TIMEOUT);

        let promotion_queue = self.delay_promotion_queue.clone();
        let target_queue = self.queue.clone();
        let cancel = self.cancel.clone();
        let task = tokio::spawn(async move { bridge_loop(promotion_queue, target_queue, cancel).await });
        *self.bridge_task.lock().await = Some(task);
    }

    /// Schedule one message. Applies `options`, registers a handle, and
    /// admits the item either to the immediate queue or the delay scheduler
    /// depending on `message.scheduled_at`.
    ///
    /// # Errors
    /// Propagates handle-registry capacity errors and queue-admission errors
    /// (full/closed/cancelled).
    pub async fn schedule_async(&self, message: Message, options: AsyncOption) -> Result<Arc<Handle>> {
        let message = self.apply_options(message, &options);
        let handle = Arc::new(Handle::new(message.id.clone()));
        self.handles.register(Arc::clone(&handle)).await?;

        if let Some(callbacks) = options.callbacks.clone() {
            self.callbacks.register_message(&message.id, callbacks).await;
        }
        if let Some(policy) = options.retry_policy {
            self.callbacks.set_retry_policy(message.id.as_str(), policy).await;
        }

        let scheduled_at = message.scheduled_at;
        let item = QueueItem::new(message, Arc::clone(&handle), None);
        self.admit(item, scheduled_at).await?;

        Ok(handle)
    }

    /// Schedule a batch of messages as one unit: every message gets its own
    /// [`Handle`], all of which are tracked by a shared [`BatchHandle`].
    ///
    /// # Errors
    /// Returns a validation error for an empty batch, and propagates
    /// handle-registry/queue-admission errors otherwise. A partial admission
    /// failure (some messages enqueued, a later one rejected) is surfaced as
    /// an error without rolling back the already-admitted items; callers
    /// that need all-or-nothing batches should check `queue_capacity`
    /// against `messages.len()` up front.
    pub async fn schedule_batch(&self, messages: Vec<Message>, options: AsyncOption) -> Result<Arc<BatchHandle>> {
        if messages.is_empty() {
            return Err(ErrorEnvelope::expected(ErrorCode::validation(), "batch must contain at least one message"));
        }

        let batch_id = BatchId::generate();
        let mut children = Vec::with_capacity(messages.len());
        let mut immediate = Vec::new();
        let mut delayed = Vec::new();

        for message in messages {
            let message = self.apply_options(message, &options);
            let handle = Arc::new(Handle::new(message.id.clone()));
            self.handles.register(Arc::clone(&handle)).await?;
            children.push(Arc::clone(&handle));

            let scheduled_at = message.scheduled_at;
            let item = QueueItem::new(message, handle, Some(BatchInfo { batch_id: batch_id.clone() }));
            match scheduled_at {
                Some(at) => delayed.push(DelayedItem::new(item, at)),
                None => immediate.push(item),
            }
        }

        let batch = Arc::new(BatchHandle::new(batch_id.clone(), children));
        self.batches.register(Arc::clone(&batch)).await;

        if let Some(callbacks) = options.callbacks.clone() {
            self.callbacks.register_batch(&batch_id, callbacks).await;
        }
        if let Some(policy) = options.retry_policy {
            self.callbacks.set_retry_policy(batch_id.as_str(), policy).await;
        }

        if !immediate.is_empty() {
            self.queue.enqueue_batch(immediate).await?;
        }
        if !delayed.is_empty() {
            self.delay_scheduler.lock().await.enqueue_batch_delayed(delayed).await?;
        }

        Ok(batch)
    }

    /// Grow the pool to `target` workers (a no-op if already at or above
    /// `target`); shrinking is left to the autoscaler's own hysteresis.
    pub async fn scale_workers(self: &Arc<Self>, target: usize) {
        let current = self.pool.worker_count().await;
        for _ in current..target {
            self.pool.add_worker(None).await;
        }
    }

    /// Register a callback set that fires for every message/batch, in
    /// addition to whichever per-message/per-batch set was passed via
    /// [`AsyncOption::callbacks`].
    pub async fn register_global_callbacks(&self, callbacks: CallbackSet) {
        self.callbacks.register_global(callbacks).await;
    }

    /// Look up a tracked [`Handle`] by message id, for operational tooling.
    /// Returns `None` once the handle has aged out of the registry's TTL.
    pub async fn get_handle(&self, message_id: &notifyhub_domain::MessageId) -> Option<Arc<Handle>> {
        self.handles.get(message_id).await
    }

    /// Look up a tracked [`BatchHandle`] by batch id, for operational tooling.
    pub async fn get_batch(&self, batch_id: &BatchId) -> Option<Arc<BatchHandle>> {
        self.batches.get(batch_id).await
    }

    /// Combined operational snapshot across the queue, delay scheduler,
    /// worker pool, callback registry, and handle registry.
    pub async fn get_stats(&self) -> ExecutorStats {
        let since_started = self.started_at.lock().await.map_or(Duration::ZERO, |at| at.elapsed());
        let pool_healthy = self.pool.is_healthy().await;
        let callbacks_healthy = self.callbacks.is_healthy().await;
        ExecutorStats {
            since_started,
            degraded: !(pool_healthy && callbacks_healthy),
            healthy: pool_healthy && callbacks_healthy,
            queue: self.queue.statistics().await,
            delayed_count: self.delay_scheduler.lock().await.scheduled_count().await,
            workers: self.pool.worker_stats().await,
            callbacks: self.callbacks.stats().await,
            handles_tracked: self.handles.len().await,
        }
    }

    /// Stop the bridge task, the delay scheduler, the callback registry, and
    /// the worker pool, in that order.
    ///
    /// # Errors
    /// Propagates [`TimeoutExceeded`] from the worker pool's own drain window.
    pub async fn stop(&self, timeout: Duration) -> std::result::Result<(), TimeoutExceeded> {
        self.cancel.cancel();

        let still_waiting = self.delay_scheduler.lock().await.close().await;
        if let Some(task) = self.bridge_task.lock().await.take() {
            task.abort();
        }
        let already_promoted = self.delay_promotion_queue.close().await;

        for delayed in still_waiting.into_iter().chain(already_promoted) {
            delayed.item.handle.fail(ErrorEnvelope::cancelled(
                "executor stopped before this scheduled item became due",
            ));
        }

        self.callbacks.shutdown(timeout).await;
        self.pool.stop(timeout).await
    }

    fn apply_options(&self, mut message: Message, options: &AsyncOption) -> Message {
        if let Some(priority) = options.priority_override {
            message.priority = priority;
        }
        for (key, value) in &options.metadata {
            message.metadata.insert(key.clone(), value.clone());
        }
        message
    }

    async fn admit(&self, item: QueueItem, scheduled_at: Option<std::time::SystemTime>) -> Result<()> {
        match scheduled_at {
            Some(at) => {
                let delayed = DelayedItem::new(item, at);
                self.delay_scheduler.lock().await.enqueue_delayed(delayed).await?;
            },
            None => {
                self.queue.enqueue(item).await?;
            },
        }
        Ok(())
    }
}

async fn bridge_loop(
    promotion_queue: PriorityQueue<DelayedItem>,
    target_queue: PriorityQueue<QueueItem>,
    cancel: CancellationToken,
) {
    loop {
        let delayed = match promotion_queue.dequeue(&cancel).await {
            Ok(delayed) => delayed,
            Err(_closed_or_cancelled) => return,
        };
        if let Err(error) = target_queue.enqueue(delayed.item).await {
            warn!(%error, "failed to promote a due delayed item into the worker queue");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::DefaultDispatcher;
    use notifyhub_domain::Target;
    use std::time::SystemTime;

    fn message() -> Message {
        Message::builder("hi", "there")
            .target(Target::builder("email", "a@example.com", "missing").build().expect("target"))
            .build()
            .expect("message")
    }

    fn executor() -> Arc<AsyncExecutor> {
        let dispatcher: Arc<dyn Dispatcher> = Arc::new(DefaultDispatcher::new());
        Arc::new(AsyncExecutor::new(
            ExecutorConfig { worker_pool: WorkerPoolConfig { min_workers: 1, ..Default::default() }, ..Default::default() },
            dispatcher,
        ))
    }

    #[tokio::test]
    async fn schedules_and_resolves_immediate_message() {
        let executor = executor();
        executor.start().await;

        let handle = executor.schedule_async(message(), AsyncOption::default()).await.expect("schedule");
        let result = handle.wait(None).await;
        assert!(result.is_ok());

        executor.stop(Duration::from_millis(300)).await.expect("stop");
    }

    #[tokio::test]
    async fn schedules_batch_and_resolves_summary() {
        let executor = executor();
        executor.start().await;

        let batch = executor
            .schedule_batch(vec![message(), message(), message()], AsyncOption::default())
            .await
            .expect("schedule batch");
        let summary = batch.wait(None).await;
        assert_eq!(summary.total, 3);

        executor.stop(Duration::from_millis(300)).await.expect("stop");
    }

    #[tokio::test]
    async fn rejects_empty_batch() {
        let executor = executor();
        executor.start().await;
        let result = executor.schedule_batch(Vec::new(), AsyncOption::default()).await;
        assert!(result.is_err());
        executor.stop(Duration::from_millis(300)).await.expect("stop");
    }

    #[tokio::test]
    async fn delayed_message_does_not_resolve_before_due_time() {
        let executor = executor();
        executor.start().await;

        let mut delayed_message = message();
        delayed_message.scheduled_at = Some(SystemTime::now() + Duration::from_millis(150));
        let handle = executor.schedule_async(delayed_message, AsyncOption::default()).await.expect("schedule");

        assert_eq!(handle.status().state, notifyhub_domain::HandleState::Pending);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(handle.status().state.is_terminal());

        executor.stop(Duration::from_millis(300)).await.expect("stop");
    }

    #[tokio::test]
    async fn stop_fails_handles_still_waiting_on_a_future_schedule() {
        let executor = executor();
        executor.start().await;

        let mut delayed_message = message();
        delayed_message.scheduled_at = Some(SystemTime::now() + Duration::from_secs(60));
        let handle = executor
            .schedule_async(delayed_message, AsyncOption::default())
            .await
            .expect("schedule");
        assert_eq!(handle.status().state, notifyhub_domain::HandleState::Pending);

        executor.stop(Duration::from_millis(300)).await.expect("stop");

        let result = handle.wait(None).await;
        assert!(
            result.is_err(),
            "a handle still sitting in the delay heap must not hang forever once the executor stops"
        );
    }

    #[tokio::test]
    async fn stats_report_since_started_and_health() {
        let executor = executor();
        executor.start().await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let stats = executor.get_stats().await;
        assert!(stats.since_started >= Duration::from_millis(10));
        assert!(stats.healthy);
        assert_eq!(stats.degraded, !stats.healthy);

        executor.stop(Duration::from_millis(300)).await.expect("stop");
    }

    #[tokio::test]
    async fn scale_workers_grows_pool() {
        let executor = executor();
        executor.start().await;
        executor.scale_workers(3).await;
        assert_eq!(executor.pool.worker_count().await, 3);
        executor.stop(Duration::from_millis(300)).await.expect("stop");
    }
}
