//! Delivers lifecycle events to user-supplied callbacks without blocking
//! dispatchers or workers: bounded concurrency, panic safety, and
//! retry-with-backoff via a scheduled min-heap (reusing
//! [`notifyhub_queue`]'s generic priority queue + delay scheduler rather than
//! ad-hoc `tokio::time::sleep` calls).

use notifyhub_domain::{BatchId, BatchSummary, CallbackEvent, Message, MessageId, Priority, Receipt};
use notifyhub_queue::{DelayScheduler, Prioritized, PriorityQueue, Scheduled};
use notifyhub_shared::{CancellationToken, ErrorEnvelope};
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::warn;

use futures_util::FutureExt;

/// Which fan-out slot a callback occupies; used to key retry policies and
/// per-type performance counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// `on_result`.
    Result,
    /// `on_error`.
    Error,
    /// `on_progress`.
    Progress,
    /// `on_complete`.
    Complete,
}

/// One registration slot: zero or more of the four lifecycle hooks.
#[derive(Clone, Default)]
pub struct CallbackSet {
    /// Invoked with the final [`Receipt`] on successful (or partial) delivery.
    pub on_result: Option<Arc<dyn Fn(Receipt) + Send + Sync>>,
    /// Invoked with the message and error on failed delivery.
    pub on_error: Option<Arc<dyn Fn(Message, ErrorEnvelope) + Send + Sync>>,
    /// Invoked on each batch progress update.
    pub on_progress: Option<Arc<dyn Fn(usize, usize) + Send + Sync>>,
    /// Invoked once a batch reaches terminal.
    pub on_complete: Option<Arc<dyn Fn(BatchSummary) + Send + Sync>>,
}

impl CallbackSet {
    /// True if none of the four hooks are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.on_result.is_none()
            && self.on_error.is_none()
            && self.on_progress.is_none()
            && self.on_complete.is_none()
    }
}

#[derive(Clone)]
enum CallbackFn {
    Result(Arc<dyn Fn(Receipt) + Send + Sync>, Receipt),
    Error(Arc<dyn Fn(Message, ErrorEnvelope) + Send + Sync>, Message, ErrorEnvelope),
    Progress(Arc<dyn Fn(usize, usize) + Send + Sync>, usize, usize),
    Complete(Arc<dyn Fn(BatchSummary) + Send + Sync>, BatchSummary),
}

impl CallbackFn {
    fn kind(&self) -> CallbackKind {
        match self {
            Self::Result(..) => CallbackKind::Result,
            Self::Error(..) => CallbackKind::Error,
            Self::Progress(..) => CallbackKind::Progress,
            Self::Complete(..) => CallbackKind::Complete,
        }
    }

    fn invoke(&self) {
        match self {
            Self::Result(f, receipt) => f(receipt.clone()),
            Self::Error(f, message, error) => f(message.clone(), error.clone()),
            Self::Progress(f, completed, total) => f(*completed, *total),
            Self::Complete(f, summary) => f(*summary),
        }
    }
}

/// Execution lifecycle state, per spec §4.5's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Queued, not yet running.
    Pending,
    /// Currently executing.
    Running,
    /// Completed without panicking.
    Success,
    /// Panicked or otherwise failed.
    Failed,
    /// Did not complete before its retry budget expired.
    Timeout,
    /// Dropped (queue full, or registry shut down).
    Cancelled,
}

/// Retry policy for one [`CallbackKind`].
#[derive(Debug, Clone, Copy)]
pub struct CallbackRetryPolicy {
    /// Maximum retry attempts after the first.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Backoff multiplier applied per retry.
    pub multiplier: f64,
    /// Cap on the computed delay.
    pub max_interval: Duration,
    /// Whether to jitter the computed delay.
    pub jitter: bool,
}

impl Default for CallbackRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_secs(1),
            multiplier: 2.0,
            max_interval: Duration::from_secs(30),
            jitter: true,
        }
    }
}

fn backoff_delay(policy: CallbackRetryPolicy, attempt: u32) -> Duration {
    let base = policy.initial_interval.as_secs_f64() * policy.multiplier.powi(attempt as i32);
    let capped = base.min(policy.max_interval.as_secs_f64());
    if !policy.jitter {
        return Duration::from_secs_f64(capped.max(0.0));
    }
    let nanos = SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |duration| u64::from(duration.subsec_nanos()));
    let seed = nanos ^ u64::from(attempt).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let unit = (seed % 1000) as f64 / 1000.0;
    let jittered = capped * (0.5 + unit);
    Duration::from_secs_f64(jittered.clamp(0.0, policy.max_interval.as_secs_f64()))
}

/// A callback dropped after its retry budget was exhausted.
#[derive(Clone)]
pub struct DeadLetter {
    /// Which hook this was.
    pub kind: CallbackKind,
    /// Key (message id or batch id, as a string) the callback was registered against.
    pub key: String,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// When it was recorded.
    pub recorded_at: Instant,
}

struct ExecutionRecord {
    kind: CallbackKind,
    state: ExecutionState,
    attempt: u32,
    scheduled_at: Instant,
}

#[derive(Default)]
struct PerfCounters {
    count: u64,
    ema_latency_micros: f64,
    recent: VecDeque<u64>,
}

impl PerfCounters {
    fn record(&mut self, latency: Duration) {
        self.count += 1;
        let sample = latency.as_micros() as f64;
        self.ema_latency_micros =
            if self.ema_latency_micros == 0.0 { sample } else { 0.2 * sample + 0.8 * self.ema_latency_micros };
        if self.recent.len() == 100 {
            self.recent.pop_front();
        }
        self.recent.push_back(latency.as_micros() as u64);
    }

    fn percentile(&self, pct: f64) -> Duration {
        if self.recent.is_empty() {
            return Duration::ZERO;
        }
        let mut sorted: Vec<u64> = self.recent.iter().copied().collect();
        sorted.sort_unstable();
        let rank = ((sorted.len() - 1) as f64 * pct).round() as usize;
        Duration::from_micros(sorted.get(rank).copied().unwrap_or(0))
    }
}

/// Read-only performance snapshot for one callback kind.
#[derive(Debug, Clone, Copy)]
pub struct PerfSnapshot {
    /// Executions recorded.
    pub count: u64,
    /// Exponential moving average latency.
    pub ema_latency: Duration,
    /// 95th percentile latency over the last ~100 executions.
    pub p95: Duration,
    /// 99th percentile latency over the last ~100 executions.
    pub p99: Duration,
}

/// Aggregate statistics for operational reporting.
#[derive(Debug, Clone, Default)]
pub struct CallbackRegistryStats {
    /// Executions that ran to completion (success or failed, not dropped).
    pub executed: u64,
    /// Executions that succeeded.
    pub succeeded: u64,
    /// Executions that failed (including panics).
    pub failed: u64,
    /// Executions dropped because the execution queue was full.
    pub dropped_full: u64,
    /// Items currently sitting in the dead-letter buffer.
    pub dead_letter_len: usize,
}

/// Configuration for [`CallbackRegistry`].
#[derive(Debug, Clone)]
pub struct CallbackRegistryConfig {
    /// Number of concurrent execution workers.
    pub executor_workers: usize,
    /// Bounded capacity of the execution queue; callbacks are dropped
    /// (and recorded as failed) when full.
    pub queue_capacity: usize,
    /// Capacity of the dead-letter buffer.
    pub dead_letter_capacity: usize,
    /// Default retry policy applied to every callback kind unless overridden.
    pub default_retry_policy: CallbackRetryPolicy,
    /// Terminal execution-record TTL before garbage collection.
    pub record_ttl: Duration,
}

impl Default for CallbackRegistryConfig {
    fn default() -> Self {
        Self {
            executor_workers: 10,
            queue_capacity: 100,
            dead_letter_capacity: 1000,
            default_retry_policy: CallbackRetryPolicy::default(),
            record_ttl: Duration::from_secs(3600),
        }
    }
}

struct PendingRetry {
    execution_id: u64,
    job: CallbackFn,
    key: String,
    attempt: u32,
    scheduled_at: SystemTime,
}

impl Prioritized for PendingRetry {
    fn priority(&self) -> Priority {
        Priority::Normal
    }
}

impl Scheduled for PendingRetry {
    type Key = u64;

    fn scheduled_at(&self) -> SystemTime {
        self.scheduled_at
    }

    fn key(&self) -> Self::Key {
        self.execution_id
    }
}

struct Inner {
    config: CallbackRegistryConfig,
    global: Mutex<CallbackSet>,
    per_key: Mutex<HashMap<String, CallbackSet>>,
    execution_tx: mpsc::Sender<(u64, CallbackFn, String)>,
    dead_letter: Mutex<VecDeque<DeadLetter>>,
    tracker: Mutex<HashMap<u64, ExecutionRecord>>,
    perf: Mutex<HashMap<CallbackKind, PerfCounters>>,
    next_id: AtomicU64,
    stats: Mutex<CallbackRegistryStats>,
    cancel: CancellationToken,
    retry_queue: PriorityQueue<PendingRetry>,
    retry_overrides: Mutex<HashMap<String, CallbackRetryPolicy>>,
}

/// Delivers [`CallbackEvent`]s to per-message/per-batch and global
/// [`CallbackSet`]s with bounded concurrency, panic recovery, and
/// heap-scheduled retry.
pub struct CallbackRegistry {
    inner: Arc<Inner>,
    executor_workers: Mutex<Vec<JoinHandle<()>>>,
    retry_scheduler: Mutex<DelayScheduler<PendingRetry>>,
    retry_consumer: Mutex<Option<JoinHandle<()>>>,
}

impl CallbackRegistry {
    /// Build a registry and spawn its execution workers and retry/dead-letter
    /// infrastructure.
    #[must_use]
    pub fn new(config: CallbackRegistryConfig) -> Self {
        let (execution_tx, execution_rx) = mpsc::channel(config.queue_capacity);
        let retry_queue: PriorityQueue<PendingRetry> = PriorityQueue::new(config.queue_capacity.max(1));

        let inner = Arc::new(Inner {
            config: config.clone(),
            global: Mutex::new(CallbackSet::default()),
            per_key: Mutex::new(HashMap::new()),
            execution_tx,
            dead_letter: Mutex::new(VecDeque::new()),
            tracker: Mutex::new(HashMap::new()),
            perf: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            stats: Mutex::new(CallbackRegistryStats::default()),
            cancel: CancellationToken::new(),
            retry_queue,
            retry_overrides: Mutex::new(HashMap::new()),
        });

        let execution_rx = Arc::new(Mutex::new(execution_rx));
        let mut workers = Vec::with_capacity(config.executor_workers);
        for _ in 0..config.executor_workers {
            let inner = Arc::clone(&inner);
            let rx = Arc::clone(&execution_rx);
            workers.push(tokio::spawn(async move { execution_worker(inner, rx).await }));
        }

        let mut retry_scheduler = DelayScheduler::new(inner.retry_queue.clone());
        retry_scheduler.start(
            notifyhub_queue::DEFAULT_TICK_INTERVAL,
            notifyhub_queue::DEFAULT_PROMOTION_TIMEOUT,
        );

        let retry_consumer_inner = Arc::clone(&inner);
        let retry_consumer = tokio::spawn(async move { retry_consumer_loop(retry_consumer_inner).await });

        Self {
            inner,
            executor_workers: Mutex::new(workers),
            retry_scheduler: Mutex::new(retry_scheduler),
            retry_consumer: Mutex::new(Some(retry_consumer)),
        }
    }

    /// Register the global callback set, applied to every message/batch.
    pub async fn register_global(&self, callbacks: CallbackSet) {
        *self.inner.global.lock().await = callbacks;
    }

    /// Register a callback set for one message id.
    pub async fn register_message(&self, message_id: &MessageId, callbacks: CallbackSet) {
        self.inner.per_key.lock().await.insert(message_id.as_str().to_string(), callbacks);
    }

    /// Register a callback set for one batch id.
    pub async fn register_batch(&self, batch_id: &BatchId, callbacks: CallbackSet) {
        self.inner.per_key.lock().await.insert(batch_id.as_str().to_string(), callbacks);
    }

    /// Override the retry policy applied to callbacks registered under `key`
    /// (a message or batch id), in place of [`CallbackRegistryConfig::default_retry_policy`].
    pub async fn set_retry_policy(&self, key: &str, policy: CallbackRetryPolicy) {
        self.inner.retry_overrides.lock().await.insert(key.to_string(), policy);
    }

    /// Fire a per-message event: per-message `on_result`/`on_error` first,
    /// then the global one, both scheduled as independent executions.
    pub async fn fire(&self, message_id: MessageId, event: CallbackEvent) {
        self.dispatch_event(message_id.as_str().to_string(), event).await;
    }

    /// Fire a per-batch event (`on_progress`/`on_complete`): global only,
    /// per spec — progress/complete are batch-wide concepts dispatched
    /// through the global set plus whatever was registered under the batch id.
    pub async fn fire_batch(&self, batch_id: BatchId, event: CallbackEvent) {
        self.dispatch_event(batch_id.as_str().to_string(), event).await;
    }

    async fn dispatch_event(&self, key: String, event: CallbackEvent) {
        let per_key = self.inner.per_key.lock().await.get(&key).cloned();
        let global = self.inner.global.lock().await.clone();

        for set in [per_key, Some(global)].into_iter().flatten() {
            if let Some(job) = resolve_callback(&set, &event) {
                self.submit(job, key.clone()).await;
            }
        }
    }

    async fn submit(&self, job: CallbackFn, key: String) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let kind = job.kind();
        self.inner.tracker.lock().await.insert(
            id,
            ExecutionRecord { kind, state: ExecutionState::Pending, attempt: 0, scheduled_at: Instant::now() },
        );

        let key_for_dead_letter = key.clone();
        if self.inner.execution_tx.try_send((id, job, key)).is_err() {
            let mut tracker = self.inner.tracker.lock().await;
            if let Some(record) = tracker.get_mut(&id) {
                record.state = ExecutionState::Cancelled;
            }
            drop(tracker);
            self.inner.stats.lock().await.dropped_full += 1;
            record_dead_letter(&self.inner, kind, key_for_dead_letter, 0).await;
        }
    }

    /// Remove a per-message callback set; called after terminal fan-out.
    pub async fn cleanup_message(&self, message_id: &MessageId) {
        self.inner.per_key.lock().await.remove(message_id.as_str());
        self.inner.retry_overrides.lock().await.remove(message_id.as_str());
    }

    /// Remove a per-batch callback set; called after terminal fan-out.
    pub async fn cleanup_batch(&self, batch_id: &BatchId) {
        self.inner.per_key.lock().await.remove(batch_id.as_str());
        self.inner.retry_overrides.lock().await.remove(batch_id.as_str());
    }

    /// Snapshot of aggregate statistics.
    pub async fn stats(&self) -> CallbackRegistryStats {
        let mut stats = self.inner.stats.lock().await.clone();
        stats.dead_letter_len = self.inner.dead_letter.lock().await.len();
        stats
    }

    /// Performance snapshot for one callback kind.
    pub async fn perf(&self, kind: CallbackKind) -> PerfSnapshot {
        let perf = self.inner.perf.lock().await;
        perf.get(&kind).map_or(
            PerfSnapshot { count: 0, ema_latency: Duration::ZERO, p95: Duration::ZERO, p99: Duration::ZERO },
            |counters| PerfSnapshot {
                count: counters.count,
                ema_latency: Duration::from_micros(counters.ema_latency_micros as u64),
                p95: counters.percentile(0.95),
                p99: counters.percentile(0.99),
            },
        )
    }

    /// Unhealthy if the failure rate exceeds 50% or the dead-letter buffer
    /// is at capacity.
    pub async fn is_healthy(&self) -> bool {
        let stats = self.stats().await;
        if stats.dead_letter_len >= self.inner.config.dead_letter_capacity {
            return false;
        }
        if stats.executed == 0 {
            return true;
        }
        (stats.failed as f64 / stats.executed as f64) <= 0.5
    }

    /// Stop the execution workers, the retry scheduler, and clear all
    /// registered callbacks.
    pub async fn shutdown(&self, timeout: Duration) {
        self.inner.cancel.cancel();
        self.retry_scheduler.lock().await.stop();
        if let Some(consumer) = self.retry_consumer.lock().await.take() {
            consumer.abort();
        }

        // Execution workers block on the shared execution queue, which stays
        // open for the registry's lifetime; give in-flight callbacks a
        // drain window, then force-stop whatever is left.
        tokio::time::sleep(timeout).await;
        let mut guard = self.executor_workers.lock().await;
        for worker in guard.drain(..) {
            worker.abort();
        }
        drop(guard);

        *self.inner.global.lock().await = CallbackSet::default();
        self.inner.per_key.lock().await.clear();
    }
}

fn resolve_callback(set: &CallbackSet, event: &CallbackEvent) -> Option<CallbackFn> {
    match event {
        CallbackEvent::Result(receipt) => {
            set.on_result.clone().map(|f| CallbackFn::Result(f, receipt.clone()))
        },
        CallbackEvent::Error(message, error) => {
            set.on_error.clone().map(|f| CallbackFn::Error(f, message.clone(), error.clone()))
        },
        CallbackEvent::Progress { completed, total } => {
            set.on_progress.clone().map(|f| CallbackFn::Progress(f, *completed, *total))
        },
        CallbackEvent::Complete(summary) => {
            set.on_complete.clone().map(|f| CallbackFn::Complete(f, *summary))
        },
    }
}

async fn execution_worker(
    inner: Arc<Inner>,
    rx: Arc<Mutex<mpsc::Receiver<(u64, CallbackFn, String)>>>,
) {
    loop {
        let next = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some((id, job, key)) = next else { return };
        run_execution(&inner, id, job, key, 0).await;
    }
}

async fn run_execution(inner: &Arc<Inner>, id: u64, job: CallbackFn, key: String, attempt: u32) {
    if let Some(record) = inner.tracker.lock().await.get_mut(&id) {
        record.state = ExecutionState::Running;
        record.attempt = attempt;
    }

    let kind = job.kind();
    let started = Instant::now();
    let outcome = AssertUnwindSafe(async { job.invoke() }).catch_unwind().await;
    let latency = started.elapsed();

    let mut stats = inner.stats.lock().await;
    stats.executed += 1;
    match &outcome {
        Ok(()) => stats.succeeded += 1,
        Err(_) => stats.failed += 1,
    }
    drop(stats);

    inner.perf.lock().await.entry(kind).or_default().record(latency);

    if let Some(record) = inner.tracker.lock().await.get_mut(&id) {
        record.state = if outcome.is_ok() { ExecutionState::Success } else { ExecutionState::Failed };
    }

    if outcome.is_err() {
        schedule_retry(inner, id, job, key, attempt).await;
    }
}

async fn schedule_retry(inner: &Arc<Inner>, id: u64, job: CallbackFn, key: String, attempt: u32) {
    let policy = inner
        .retry_overrides
        .lock()
        .await
        .get(&key)
        .copied()
        .unwrap_or(inner.config.default_retry_policy);
    if attempt >= policy.max_retries {
        record_dead_letter(inner, job.kind(), key, attempt).await;
        return;
    }
    let delay = backoff_delay(policy, attempt + 1);
    let pending = PendingRetry {
        execution_id: id,
        job,
        key,
        attempt: attempt + 1,
        scheduled_at: SystemTime::now() + delay,
    };
    if let Err(error) = inner.retry_queue.enqueue(pending).await {
        warn!(%error, "failed to schedule callback retry, dropping");
    }
}

async fn record_dead_letter(inner: &Arc<Inner>, kind: CallbackKind, key: String, attempts: u32) {
    let mut dead_letter = inner.dead_letter.lock().await;
    if dead_letter.len() >= inner.config.dead_letter_capacity {
        dead_letter.pop_front();
    }
    dead_letter.push_back(DeadLetter { kind, key, attempts, recorded_at: Instant::now() });
}

async fn retry_consumer_loop(inner: Arc<Inner>) {
    loop {
        let pending = match inner.retry_queue.dequeue(&inner.cancel).await {
            Ok(pending) => pending,
            Err(_closed_or_cancelled) => return,
        };
        run_execution(&inner, pending.execution_id, pending.job, pending.key, pending.attempt).await;
    }
}
