//! Elastic worker pool: drains the priority queue through the [`Dispatcher`],
//! with a pluggable load balancer, a health monitor, and an autoscaler.

use crate::batch_registry::BatchRegistry;
use crate::callback_registry::CallbackRegistry;
use crate::dispatcher::Dispatcher;
use crate::queue_item::QueueItem;
use futures_util::FutureExt;
use notifyhub_domain::CallbackEvent;
use notifyhub_queue::PriorityQueue;
use notifyhub_shared::{CancellationToken, CorrelationId, RequestContext};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Tuning knobs for [`WorkerPool`]. Mirrors the teacher's preference for
/// explicit, serializable configuration structs over hardcoded constants.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Minimum number of workers kept running at all times.
    pub min_workers: usize,
    /// Maximum number of workers the autoscaler may grow to.
    pub max_workers: usize,
    /// Target fraction of workers processing, in `(0, 1]`.
    pub target_load: f64,
    /// Minimum time between successive scale-ups.
    pub scale_up_delay: Duration,
    /// Minimum time between successive scale-downs.
    pub scale_down_delay: Duration,
    /// How often the health monitor inspects worker activity.
    pub health_check_interval: Duration,
    /// How long a worker may sit idle (while the queue is non-empty) before
    /// being reported unhealthy.
    pub max_idle_time: Duration,
    /// How many items a worker accumulates before processing as a batch.
    pub task_batch_size: usize,
    /// How long a worker waits to fill a batch before processing what it has.
    pub batch_window: Duration,
    /// How many workers are started per boot batch, to avoid resource spikes.
    pub boot_batch_size: usize,
    /// Pause between boot batches.
    pub boot_batch_pause: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            min_workers: 2,
            max_workers: 10,
            target_load: 0.75,
            scale_up_delay: Duration::from_secs(30),
            scale_down_delay: Duration::from_secs(60),
            health_check_interval: Duration::from_secs(10),
            max_idle_time: Duration::from_secs(300),
            task_batch_size: 1,
            batch_window: Duration::from_secs(1),
            boot_batch_size: 2,
            boot_batch_pause: Duration::from_millis(10),
        }
    }
}

/// Lifecycle state of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting for work.
    Idle,
    /// Currently dispatching a batch.
    Processing,
    /// Draining its current batch before exit.
    ShuttingDown,
    /// Task has exited.
    Stopped,
}

/// Tags a worker as preferring certain platforms/priorities when the
/// [`LoadBalancer`] is [`Affinity`].
#[derive(Debug, Clone, Default)]
pub struct WorkerAffinity {
    /// Platform names this worker prefers (matches `Target::platform`).
    pub platforms: HashSet<String>,
}

struct WorkerCounters {
    processed: AtomicU64,
    errors: AtomicU64,
    ema_latency_micros: Mutex<f64>,
    last_activity: Mutex<Instant>,
}

impl WorkerCounters {
    fn new() -> Self {
        Self {
            processed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            ema_latency_micros: Mutex::new(0.0),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    async fn record(&self, latency: Duration, success: bool) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        let sample = latency.as_micros() as f64;
        let mut ema = self.ema_latency_micros.lock().await;
        *ema = if *ema == 0.0 { sample } else { 0.2 * sample + 0.8 * *ema };
        *self.last_activity.lock().await = Instant::now();
    }

    async fn touch(&self) {
        *self.last_activity.lock().await = Instant::now();
    }
}

/// Point-in-time snapshot of one worker, for stats/health reporting.
#[derive(Debug, Clone)]
pub struct WorkerStats {
    /// Worker's pool-local id.
    pub id: usize,
    /// Current lifecycle state.
    pub state: WorkerState,
    /// Affinity tags, if any.
    pub affinity: Option<WorkerAffinity>,
    /// Items processed over the worker's lifetime.
    pub processed: u64,
    /// Items that failed dispatch.
    pub errors: u64,
    /// Exponential moving average dispatch latency.
    pub ema_latency: Duration,
    /// Time since the worker's last activity.
    pub idle_for: Duration,
}

struct WorkerHandle {
    id: usize,
    affinity: Option<WorkerAffinity>,
    state: Arc<Mutex<WorkerState>>,
    counters: Arc<WorkerCounters>,
    inbox: mpsc::UnboundedSender<Vec<QueueItem>>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    async fn stats(&self) -> WorkerStats {
        let state = *self.state.lock().await;
        let processed = self.counters.processed.load(Ordering::Relaxed);
        let errors = self.counters.errors.load(Ordering::Relaxed);
        let ema = *self.counters.ema_latency_micros.lock().await;
        let idle_for = self.counters.last_activity.lock().await.elapsed();
        WorkerStats {
            id: self.id,
            state,
            affinity: self.affinity.clone(),
            processed,
            errors,
            ema_latency: Duration::from_micros(ema as u64),
            idle_for,
        }
    }
}

/// Strategy used to pick which worker should receive the next drained batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBalancerStrategy {
    /// Cycle through workers in order.
    RoundRobin,
    /// Prefer the worker with the fewest items processed recently (idle first).
    LeastConnections,
    /// Prefer the worker with the highest recent throughput.
    Weighted,
    /// Prefer a worker tagged for the batch's platform, falling back to any idle worker.
    Affinity,
}

struct LoadBalancer {
    strategy: LoadBalancerStrategy,
    round_robin_cursor: AtomicUsize,
}

impl LoadBalancer {
    fn new(strategy: LoadBalancerStrategy) -> Self {
        Self {
            strategy,
            round_robin_cursor: AtomicUsize::new(0),
        }
    }

    /// Select a worker index out of `workers` for a batch whose lead item
    /// targets `platform_hint` (the first target's platform, used only by
    /// the affinity strategy).
    async fn select(&self, workers: &[Arc<WorkerHandle>], platform_hint: Option<&str>) -> usize {
        match self.strategy {
            LoadBalancerStrategy::RoundRobin => {
                let cursor = self.round_robin_cursor.fetch_add(1, Ordering::Relaxed);
                cursor % workers.len()
            },
            LoadBalancerStrategy::LeastConnections => {
                let mut best = 0;
                let mut best_processed = u64::MAX;
                for (index, worker) in workers.iter().enumerate() {
                    let processed = worker.counters.processed.load(Ordering::Relaxed);
                    if processed < best_processed {
                        best_processed = processed;
                        best = index;
                    }
                }
                best
            },
            LoadBalancerStrategy::Weighted => {
                let mut best = 0;
                let mut best_throughput = -1.0;
                for (index, worker) in workers.iter().enumerate() {
                    let ema = *worker.counters.ema_latency_micros.lock().await;
                    let throughput = if ema <= 0.0 { f64::MAX } else { 1.0 / ema };
                    if throughput > best_throughput {
                        best_throughput = throughput;
                        best = index;
                    }
                }
                best
            },
            LoadBalancerStrategy::Affinity => {
                if let Some(platform) = platform_hint {
                    for (index, worker) in workers.iter().enumerate() {
                        if worker
                            .affinity
                            .as_ref()
                            .is_some_and(|affinity| affinity.platforms.contains(platform))
                        {
                            return index;
                        }
                    }
                }
                let mut best = 0;
                let mut best_processed = u64::MAX;
                for (index, worker) in workers.iter().enumerate() {
                    if worker.affinity.is_some() {
                        continue;
                    }
                    let processed = worker.counters.processed.load(Ordering::Relaxed);
                    if processed < best_processed {
                        best_processed = processed;
                        best = index;
                    }
                }
                best
            },
        }
    }
}

/// An unhealthy-worker event surfaced by the health monitor.
#[derive(Debug, Clone)]
pub struct HealthEvent {
    /// The worker that was found unhealthy.
    pub worker_id: usize,
    /// How long it has been idle while the queue had work waiting.
    pub idle_for: Duration,
}

/// Error returned when [`WorkerPool::stop`] cannot drain workers in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutExceeded;

impl std::fmt::Display for TimeoutExceeded {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("worker pool did not drain within the allotted timeout")
    }
}

impl std::error::Error for TimeoutExceeded {}

/// Elastic pool of workers draining `queue` through `dispatcher`.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    queue: PriorityQueue<QueueItem>,
    dispatcher: Arc<dyn Dispatcher>,
    callbacks: Arc<CallbackRegistry>,
    batches: Arc<BatchRegistry>,
    balancer: Arc<LoadBalancer>,
    cancel: CancellationToken,
    workers: Mutex<Vec<Arc<WorkerHandle>>>,
    next_worker_id: AtomicUsize,
    drain_task: Mutex<Option<JoinHandle<()>>>,
    monitor_task: Mutex<Option<JoinHandle<()>>>,
    autoscaler_task: Mutex<Option<JoinHandle<()>>>,
    health_events_tx: mpsc::Sender<HealthEvent>,
    health_events_rx: Mutex<Option<mpsc::Receiver<HealthEvent>>>,
    stopped: Mutex<bool>,
}

impl WorkerPool {
    /// Construct a pool. Call [`WorkerPool::start`] to boot workers.
    #[must_use]
    pub fn new(
        config: WorkerPoolConfig,
        queue: PriorityQueue<QueueItem>,
        dispatcher: Arc<dyn Dispatcher>,
        callbacks: Arc<CallbackRegistry>,
        batches: Arc<BatchRegistry>,
        strategy: LoadBalancerStrategy,
    ) -> Self {
        let (health_events_tx, health_events_rx) = mpsc::channel(64);
        Self {
            config,
            queue,
            dispatcher,
            callbacks,
            batches,
            balancer: Arc::new(LoadBalancer::new(strategy)),
            cancel: CancellationToken::new(),
            workers: Mutex::new(Vec::new()),
            next_worker_id: AtomicUsize::new(0),
            drain_task: Mutex::new(None),
            monitor_task: Mutex::new(None),
            autoscaler_task: Mutex::new(None),
            health_events_tx,
            health_events_rx: Mutex::new(Some(health_events_rx)),
            stopped: Mutex::new(false),
        }
    }

    /// Boot `min_workers` in small batches, then start the drain loop, the
    /// health monitor, and the autoscaler, in that order.
    pub async fn start(self: &Arc<Self>) {
        let min_workers = self.config.min_workers.max(1);
        let mut booted = 0;
        while booted < min_workers {
            let batch = self.config.boot_batch_size.min(min_workers - booted);
            for _ in 0..batch {
                self.add_worker(None).await;
            }
            booted += batch;
            if booted < min_workers {
                tokio::time::sleep(self.config.boot_batch_pause).await;
            }
        }

        self.spawn_drain_loop();
        self.spawn_health_monitor();
        self.spawn_autoscaler();
    }

    /// Take ownership of the unhealthy-worker event receiver. Only the first
    /// caller gets a channel.
    pub async fn take_health_events(&self) -> Option<mpsc::Receiver<HealthEvent>> {
        self.health_events_rx.lock().await.take()
    }

    /// Add one worker, optionally tagged with an affinity.
    pub async fn add_worker(self: &Arc<Self>, affinity: Option<WorkerAffinity>) {
        let id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(WorkerState::Idle));
        let counters = Arc::new(WorkerCounters::new());

        let pool = Arc::clone(self);
        let worker_state = Arc::clone(&state);
        let worker_counters = Arc::clone(&counters);
        let task = tokio::spawn(async move {
            worker_loop(pool, id, rx, worker_state, worker_counters).await;
        });

        let handle = Arc::new(WorkerHandle {
            id,
            affinity,
            state,
            counters,
            inbox: tx,
            task,
        });
        self.workers.lock().await.push(handle);
    }

    /// Remove one idle worker, if any exists; used by the autoscaler to
    /// shrink the pool. Returns `true` if a worker was removed.
    async fn remove_idle_worker(&self) -> bool {
        let mut workers = self.workers.lock().await;
        let mut target = None;
        for (index, worker) in workers.iter().enumerate() {
            if *worker.state.lock().await == WorkerState::Idle {
                target = Some(index);
                break;
            }
        }
        let Some(index) = target else { return false };
        let worker = workers.remove(index);
        worker.task.abort();
        true
    }

    /// Current snapshot of every worker.
    pub async fn worker_stats(&self) -> Vec<WorkerStats> {
        let workers = self.workers.lock().await;
        let mut out = Vec::with_capacity(workers.len());
        for worker in workers.iter() {
            out.push(worker.stats().await);
        }
        out
    }

    /// Current worker count.
    pub async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }

    /// Overall health: not stopped, and at least half the workers (rounding
    /// down the threshold) are "healthy" (active within `max_idle_time` or
    /// the queue is currently empty), and at least `min_workers` remain.
    pub async fn is_healthy(&self) -> bool {
        if *self.stopped.lock().await {
            return false;
        }
        let workers = self.workers.lock().await;
        if workers.len() < self.config.min_workers {
            return false;
        }
        let queue_empty = self.queue.is_empty().await;
        let mut healthy = 0;
        for worker in workers.iter() {
            let idle_for = worker.counters.last_activity.lock().await.elapsed();
            if queue_empty || idle_for <= self.config.max_idle_time {
                healthy += 1;
            }
        }
        healthy * 2 >= workers.len()
    }

    fn spawn_drain_loop(self: &Arc<Self>) {
        let pool = Arc::clone(self);
        let task = tokio::spawn(async move { drain_loop(pool).await });
        if let Ok(mut slot) = self.drain_task.try_lock() {
            *slot = Some(task);
        }
    }

    fn spawn_health_monitor(self: &Arc<Self>) {
        let pool = Arc::clone(self);
        let task = tokio::spawn(async move { health_monitor_loop(pool).await });
        if let Ok(mut slot) = self.monitor_task.try_lock() {
            *slot = Some(task);
        }
    }

    fn spawn_autoscaler(self: &Arc<Self>) {
        let pool = Arc::clone(self);
        let task = tokio::spawn(async move { autoscaler_loop(pool).await });
        if let Ok(mut slot) = self.autoscaler_task.try_lock() {
            *slot = Some(task);
        }
    }

    /// Stop the pool: stop the autoscaler, signal cancellation, allow a
    /// drain window of `timeout / 3` for workers to finish in-flight items,
    /// then force-abort stragglers and stop the health monitor.
    ///
    /// # Errors
    /// Returns [`TimeoutExceeded`] if workers are still running after the
    /// drain window and had to be force-stopped.
    pub async fn stop(&self, timeout: Duration) -> Result<(), TimeoutExceeded> {
        *self.stopped.lock().await = true;

        if let Some(task) = self.autoscaler_task.lock().await.take() {
            task.abort();
        }

        self.cancel.cancel();
        let drained = self.queue.close().await;
        for item in drained {
            item.handle.fail(notifyhub_shared::ErrorEnvelope::cancelled(
                "worker pool stopped before this item was dispatched",
            ));
        }

        let drain_window = timeout / 3;
        let deadline = Instant::now() + drain_window;

        let mut exceeded = false;
        loop {
            let all_stopped = {
                let workers = self.workers.lock().await;
                let mut all_idle = true;
                for worker in workers.iter() {
                    if *worker.state.lock().await == WorkerState::Processing {
                        all_idle = false;
                        break;
                    }
                }
                all_idle
            };
            if all_stopped || Instant::now() >= deadline {
                exceeded = !all_stopped;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut workers = self.workers.lock().await;
        for worker in workers.drain(..) {
            worker.task.abort();
        }
        drop(workers);

        if let Some(task) = self.drain_task.lock().await.take() {
            task.abort();
        }
        if let Some(task) = self.monitor_task.lock().await.take() {
            task.abort();
        }

        if exceeded {
            Err(TimeoutExceeded)
        } else {
            Ok(())
        }
    }
}

/// Central coordinator task: dequeues from the shared priority queue (so
/// "the balancer selects which worker consumes next" maps onto the pull
/// contract by having one coordinator perform the `Dequeue`/batch-drain and
/// then route the result through the balancer), and hands batches to the
/// chosen worker's inbox.
async fn drain_loop(pool: Arc<WorkerPool>) {
    loop {
        let first = match pool.queue.dequeue(&pool.cancel).await {
            Ok(item) => item,
            Err(_closed_or_cancelled) => return,
        };

        let mut batch = vec![first];
        if pool.config.task_batch_size > 1 {
            let rest = tokio::time::timeout(
                pool.config.batch_window,
                pool.queue.dequeue_batch(pool.config.task_batch_size - 1),
            )
            .await
            .unwrap_or_default();
            batch.extend(rest);
        }

        let workers = pool.workers.lock().await.clone();
        if workers.is_empty() {
            for item in batch {
                item.handle.fail(notifyhub_shared::ErrorEnvelope::unexpected(
                    notifyhub_shared::ErrorCode::internal(),
                    "no workers available to process this item",
                    notifyhub_shared::ErrorClass::Retriable,
                ));
            }
            continue;
        }

        let platform_hint = batch[0].message.targets.first().map(|target| target.platform.as_str());
        let index = pool.balancer.select(&workers, platform_hint).await;
        if let Some(worker) = workers.get(index) {
            if worker.inbox.send(batch).is_err() {
                warn!(worker_id = worker.id, "worker inbox closed, dropping batch");
            }
        }
    }
}

async fn worker_loop(
    pool: Arc<WorkerPool>,
    id: usize,
    mut inbox: mpsc::UnboundedReceiver<Vec<QueueItem>>,
    state: Arc<Mutex<WorkerState>>,
    counters: Arc<WorkerCounters>,
) {
    while let Some(batch) = inbox.recv().await {
        *state.lock().await = WorkerState::Processing;
        for item in batch {
            process_item(&pool, &item, &counters).await;
        }
        *state.lock().await = WorkerState::Idle;
        counters.touch().await;

        if pool.cancel.is_cancelled() {
            break;
        }
    }
    *state.lock().await = WorkerState::Stopped;
    debug!(worker_id = id, "worker stopped");
}

async fn process_item(pool: &Arc<WorkerPool>, item: &QueueItem, counters: &Arc<WorkerCounters>) {
    if item.handle.is_cancel_requested() {
        return;
    }
    item.handle.mark_processing();

    let started = Instant::now();
    let ctx = RequestContext::new(CorrelationId::new_job_id());

    let dispatch_result =
        std::panic::AssertUnwindSafe(pool.dispatcher.dispatch(&ctx, &item.message))
            .catch_unwind()
            .await;

    let outcome = match dispatch_result {
        Ok(Ok(receipt)) if receipt.status == notifyhub_domain::ReceiptStatus::Failed => {
            let error = notifyhub_shared::ErrorEnvelope::expected(
                notifyhub_shared::ErrorCode::all_targets_failed(),
                format!("all {} target(s) failed", receipt.total),
            );
            item.handle.fail(error.clone());
            record_terminal(pool, item, None, Some(error)).await;
            false
        },
        Ok(Ok(receipt)) => {
            item.handle.complete(receipt.clone());
            record_terminal(pool, item, Some(receipt), None).await;
            true
        },
        Ok(Err(error)) => {
            item.handle.fail(error.clone());
            record_terminal(pool, item, None, Some(error)).await;
            false
        },
        Err(_panic) => {
            let error = notifyhub_shared::ErrorEnvelope::unexpected(
                notifyhub_shared::ErrorCode::adapter(),
                "dispatch panicked",
                notifyhub_shared::ErrorClass::NonRetriable,
            );
            item.handle.fail(error.clone());
            record_terminal(pool, item, None, Some(error)).await;
            false
        },
    };

    counters.record(started.elapsed(), outcome).await;
}

async fn record_terminal(
    pool: &Arc<WorkerPool>,
    item: &QueueItem,
    receipt: Option<notifyhub_domain::Receipt>,
    error: Option<notifyhub_shared::ErrorEnvelope>,
) {
    let succeeded = receipt.is_some();

    if let Some(receipt) = receipt {
        pool.callbacks
            .fire(item.message.id.clone(), CallbackEvent::Result(receipt))
            .await;
    }
    if let Some(error) = error {
        pool.callbacks
            .fire(item.message.id.clone(), CallbackEvent::Error(item.message.clone(), error))
            .await;
    }
    pool.callbacks.cleanup_message(&item.message.id).await;

    if let Some(batch_info) = &item.batch_info {
        if let Some(batch) = pool.batches.get(&batch_info.batch_id).await {
            batch.record_child_terminal(succeeded);
            let (completed, _failed, total) = batch.counters();
            pool.callbacks
                .fire_batch(
                    batch_info.batch_id.clone(),
                    CallbackEvent::Progress { completed, total },
                )
                .await;
            if batch.is_done() {
                let (completed, failed, total) = batch.counters();
                pool.callbacks
                    .fire_batch(
                        batch_info.batch_id.clone(),
                        CallbackEvent::Complete(notifyhub_domain::BatchSummary { total, completed, failed }),
                    )
                    .await;
                pool.batches.remove(&batch_info.batch_id).await;
                pool.callbacks.cleanup_batch(&batch_info.batch_id).await;
            }
        }
    }
}

async fn health_monitor_loop(pool: Arc<WorkerPool>) {
    let mut interval = tokio::time::interval(pool.config.health_check_interval);
    loop {
        tokio::select! {
            () = pool.cancel.cancelled() => return,
            _ = interval.tick() => {},
        }
        let queue_non_empty = !pool.queue.is_empty().await;
        if !queue_non_empty {
            continue;
        }
        let workers = pool.workers.lock().await.clone();
        for worker in workers {
            let idle_for = worker.counters.last_activity.lock().await.elapsed();
            if idle_for > pool.config.max_idle_time {
                let _dropped_if_full = pool
                    .health_events_tx
                    .try_send(HealthEvent { worker_id: worker.id, idle_for });
            }
        }
    }
}

async fn autoscaler_loop(pool: Arc<WorkerPool>) {
    let mut samples: VecDeque<f64> = VecDeque::with_capacity(10);
    let mut last_scale_up = Instant::now() - pool.config.scale_up_delay;
    let mut last_scale_down = Instant::now() - pool.config.scale_down_delay;
    let mut interval = tokio::time::interval(Duration::from_millis(
        pool.config.health_check_interval.as_millis().max(50) as u64 / 2,
    ));

    loop {
        tokio::select! {
            () = pool.cancel.cancelled() => return,
            _ = interval.tick() => {},
        }

        let workers = pool.workers.lock().await.clone();
        if workers.is_empty() {
            continue;
        }
        let mut processing = 0;
        for worker in &workers {
            if *worker.state.lock().await == WorkerState::Processing {
                processing += 1;
            }
        }
        let load = f64::from(processing) / workers.len() as f64;

        if samples.len() == 10 {
            samples.pop_front();
        }
        samples.push_back(load);
        let average = samples.iter().sum::<f64>() / samples.len() as f64;

        let now = Instant::now();
        if average > pool.config.target_load
            && now.duration_since(last_scale_up) > pool.config.scale_up_delay
            && workers.len() < pool.config.max_workers
        {
            pool.add_worker(None).await;
            last_scale_up = now;
            debug!(average, new_count = workers.len() + 1, "autoscaler scaled up");
        } else if average < pool.config.target_load * 0.5
            && now.duration_since(last_scale_down) > pool.config.scale_down_delay
            && workers.len() > pool.config.min_workers
            && pool.remove_idle_worker().await
        {
            last_scale_down = now;
            debug!(average, "autoscaler scaled down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback_registry::CallbackRegistryConfig;
    use crate::dispatcher::DefaultDispatcher;
    use crate::handle::Handle;
    use notifyhub_domain::{Message, MessageId, Priority, Target};

    fn message(priority: Priority) -> Message {
        Message::builder("hi", "there")
            .target(Target::builder("email", "a@example.com", "missing").build().expect("target"))
            .priority(priority)
            .build()
            .expect("message")
    }

    async fn pool_with(config: WorkerPoolConfig) -> Arc<WorkerPool> {
        let dispatcher: Arc<dyn Dispatcher> = Arc::new(DefaultDispatcher::new());
        pool_with_dispatcher(config, dispatcher).await
    }

    async fn pool_with_dispatcher(config: WorkerPoolConfig, dispatcher: Arc<dyn Dispatcher>) -> Arc<WorkerPool> {
        let queue = PriorityQueue::new(100);
        let callbacks = Arc::new(CallbackRegistry::new(CallbackRegistryConfig::default()));
        let batches = Arc::new(BatchRegistry::new());
        let pool = Arc::new(WorkerPool::new(
            config,
            queue,
            dispatcher,
            callbacks,
            batches,
            LoadBalancerStrategy::LeastConnections,
        ));
        pool.start().await;
        pool
    }

    struct AlwaysSucceeds;

    impl notifyhub_ports::PlatformAdapter for AlwaysSucceeds {
        fn name(&self) -> &str {
            "email"
        }

        fn send<'a>(
            &'a self,
            _ctx: &'a notifyhub_shared::RequestContext,
            _message: &'a Message,
            targets: &'a [notifyhub_domain::Target],
        ) -> notifyhub_ports::BoxFuture<'a, notifyhub_shared::Result<Vec<notifyhub_domain::SendResult>>> {
            Box::pin(async move {
                Ok(targets
                    .iter()
                    .map(|target| {
                        notifyhub_domain::SendResult::success(
                            target.clone(),
                            "email",
                            std::time::SystemTime::now(),
                            Duration::from_millis(1),
                            1,
                        )
                    })
                    .collect())
            })
        }

        fn supports_target(&self, _target: &notifyhub_domain::Target) -> bool {
            true
        }

        fn health<'a>(
            &'a self,
            _ctx: &'a notifyhub_shared::RequestContext,
        ) -> notifyhub_ports::BoxFuture<'a, notifyhub_shared::Result<()>> {
            Box::pin(async { Ok(()) })
        }

        fn shutdown<'a>(
            &'a self,
            _ctx: &'a notifyhub_shared::RequestContext,
        ) -> notifyhub_ports::BoxFuture<'a, notifyhub_shared::Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn processes_enqueued_item_to_completion() {
        let pool = pool_with(WorkerPoolConfig { min_workers: 1, ..Default::default() }).await;
        let message = message(Priority::Normal);
        let handle = Arc::new(Handle::new(message.id.clone()));
        let item = QueueItem::new(message, Arc::clone(&handle), None);
        pool.queue.enqueue(item).await.expect("enqueue");

        let result = handle.wait(None).await;
        assert!(result.is_ok());
        pool.stop(Duration::from_millis(300)).await.expect("stop");
    }

    #[tokio::test]
    async fn unknown_platform_resolves_as_failure_not_crash() {
        let pool = pool_with(WorkerPoolConfig { min_workers: 1, ..Default::default() }).await;
        let message = Message::builder("hi", "there")
            .target(Target::builder("email", "a@example.com", "nope").build().expect("t"))
            .build()
            .expect("message");
        let id = MessageId::generate();
        let handle = Arc::new(Handle::new(id));
        let item = QueueItem::new(message, Arc::clone(&handle), None);
        pool.queue.enqueue(item).await.expect("enqueue");

        let result = handle.wait(None).await;
        assert!(result.is_err(), "a wholly-failed receipt (every target unknown) fails the handle");
        assert_eq!(handle.status().state, notifyhub_domain::HandleState::Failed);
        pool.stop(Duration::from_millis(300)).await.expect("stop");
    }

    #[tokio::test]
    async fn partial_failure_still_completes_the_handle() {
        let mut dispatcher = DefaultDispatcher::new();
        dispatcher.register_platform(Arc::new(AlwaysSucceeds));
        let pool = pool_with_dispatcher(
            WorkerPoolConfig { min_workers: 1, ..Default::default() },
            Arc::new(dispatcher),
        )
        .await;
        let message = Message::builder("hi", "there")
            .target(Target::builder("email", "a@example.com", "email").build().expect("t"))
            .target(Target::builder("email", "b@example.com", "nope").build().expect("t"))
            .build()
            .expect("message");
        let handle = Arc::new(Handle::new(message.id.clone()));
        let item = QueueItem::new(message, Arc::clone(&handle), None);
        pool.queue.enqueue(item).await.expect("enqueue");

        let result = handle.wait(None).await;
        assert!(result.is_ok(), "a partially-succeeding receipt still completes the handle");
        pool.stop(Duration::from_millis(300)).await.expect("stop");
    }

    #[tokio::test]
    async fn stop_fails_pending_items() {
        let pool = pool_with(WorkerPoolConfig { min_workers: 1, ..Default::default() }).await;
        pool.stop(Duration::from_millis(300)).await.expect("stop");
        assert!(!pool.is_healthy().await);
    }
}
