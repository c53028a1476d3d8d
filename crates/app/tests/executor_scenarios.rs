//! End-to-end scenarios driven through [`AsyncExecutor`], exercising the
//! queue/worker-pool/callback-registry stack as a caller would.

use notifyhub_app::{AsyncExecutor, AsyncOption, DefaultDispatcher, Dispatcher, ExecutorConfig, LoadBalancerStrategy, WorkerPoolConfig};
use notifyhub_domain::{Message, Priority, ReceiptStatus, SendResult, Target};
use notifyhub_ports::{BoxFuture, PlatformAdapter};
use notifyhub_shared::{RequestContext, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// An adapter that always succeeds, after an optional per-call delay, and
/// records each send's observed wall-clock order.
struct RecordingAdapter {
    name: String,
    delay: Duration,
    order: Arc<Mutex<Vec<(String, SystemTime)>>>,
}

impl RecordingAdapter {
    fn new(name: impl Into<String>, delay: Duration, order: Arc<Mutex<Vec<(String, SystemTime)>>>) -> Self {
        Self { name: name.into(), delay, order }
    }
}

impl PlatformAdapter for RecordingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn send<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        message: &'a Message,
        targets: &'a [Target],
    ) -> BoxFuture<'a, Result<Vec<SendResult>>> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.order.lock().expect("lock").push((message.title.clone(), SystemTime::now()));
            Ok(targets
                .iter()
                .map(|target| SendResult::success(target.clone(), &self.name, SystemTime::now(), self.delay, 1))
                .collect())
        })
    }

    fn supports_target(&self, _target: &Target) -> bool {
        true
    }

    fn health<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn shutdown<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// An adapter that fails delivery to specific target values while
/// succeeding for everything else, in one call.
struct SelectiveFailureAdapter {
    fails: Vec<String>,
}

impl PlatformAdapter for SelectiveFailureAdapter {
    fn name(&self) -> &str {
        "email"
    }

    fn send<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _message: &'a Message,
        targets: &'a [Target],
    ) -> BoxFuture<'a, Result<Vec<SendResult>>> {
        Box::pin(async move {
            Ok(targets
                .iter()
                .map(|target| {
                    if self.fails.contains(&target.value) {
                        SendResult::failure(target.clone(), "email", "rejected by provider", SystemTime::now(), Duration::ZERO, 1)
                    } else {
                        SendResult::success(target.clone(), "email", SystemTime::now(), Duration::ZERO, 1)
                    }
                })
                .collect())
        })
    }

    fn supports_target(&self, _target: &Target) -> bool {
        true
    }

    fn health<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn shutdown<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// An adapter that blocks until released, so a test can hold items
/// in-flight long enough to observe ordering or cancellation.
struct BlockingAdapter {
    delay: Duration,
    in_flight: Arc<AtomicU32>,
}

impl PlatformAdapter for BlockingAdapter {
    fn name(&self) -> &str {
        "email"
    }

    fn send<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _message: &'a Message,
        targets: &'a [Target],
    ) -> BoxFuture<'a, Result<Vec<SendResult>>> {
        Box::pin(async move {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(targets
                .iter()
                .map(|target| SendResult::success(target.clone(), "email", SystemTime::now(), self.delay, 1))
                .collect())
        })
    }

    fn supports_target(&self, _target: &Target) -> bool {
        true
    }

    fn health<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn shutdown<'a>(&'a self, _ctx: &'a RequestContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

fn message_with(title: &str, priority: Priority) -> Message {
    Message::builder(title, "there")
        .target(Target::builder("email", "a@example.com", "email").build().expect("target"))
        .priority(priority)
        .build()
        .expect("message")
}

#[tokio::test]
async fn synchronous_single_target_success() {
    let mut dispatcher = DefaultDispatcher::new();
    dispatcher.register_platform(Arc::new(RecordingAdapter::new(
        "email",
        Duration::ZERO,
        Arc::new(Mutex::new(Vec::new())),
    )));
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(dispatcher);

    let executor = Arc::new(AsyncExecutor::new(
        ExecutorConfig { worker_pool: WorkerPoolConfig { min_workers: 1, ..Default::default() }, ..Default::default() },
        dispatcher,
    ));
    executor.start().await;

    let message = message_with("hi", Priority::Normal);
    let handle = executor.schedule_async(message, AsyncOption::default()).await.expect("schedule");
    let receipt = handle.wait(None).await.expect("resolved");

    assert_eq!(receipt.status, ReceiptStatus::Success);
    assert_eq!(receipt.total, 1);
    assert_eq!(receipt.successful, 1);
    assert_eq!(receipt.failed, 0);
    assert!(receipt.results[0].success);

    executor.stop(Duration::from_millis(300)).await.expect("stop");
}

#[tokio::test]
async fn priority_ordering_drains_highest_first() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut dispatcher = DefaultDispatcher::new();
    dispatcher.register_platform(Arc::new(RecordingAdapter::new("email", Duration::from_millis(50), Arc::clone(&order))));
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(dispatcher);

    let executor = Arc::new(AsyncExecutor::new(
        ExecutorConfig {
            worker_pool: WorkerPoolConfig { min_workers: 1, boot_batch_size: 1, ..Default::default() },
            load_balancer: LoadBalancerStrategy::RoundRobin,
            ..Default::default()
        },
        dispatcher,
    ));
    executor.start().await;

    // Occupy the single worker with a blocking send so the next four
    // messages queue up and can be drained in priority order.
    let blocker = message_with("blocker", Priority::Low);
    let blocker_handle = executor.schedule_async(blocker, AsyncOption::default()).await.expect("schedule");
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Scheduled as one batch so all four land in the queue atomically,
    // before the (currently busy) worker can drain any of them — otherwise
    // a message scheduled early could be dequeued before a higher-priority
    // one arrives, since the worker is free to drain between individual
    // `schedule_async` calls.
    let priorities = [Priority::Low, Priority::Urgent, Priority::Normal, Priority::High];
    let messages: Vec<Message> = priorities
        .into_iter()
        .enumerate()
        .map(|(index, priority)| message_with(&format!("m{index}"), priority))
        .collect();
    let batch = executor.schedule_batch(messages, AsyncOption::default()).await.expect("schedule batch");

    blocker_handle.wait(None).await.expect("blocker resolved");
    for handle in batch.children() {
        handle.wait(None).await.expect("resolved");
    }

    let seen = order.lock().expect("lock");
    // First entry is the blocker; the remaining four reflect dequeue order.
    let titles: Vec<&str> = seen[1..].iter().map(|(title, _)| title.as_str()).collect();
    assert_eq!(titles, vec!["m1", "m3", "m2", "m0"], "urgent, high, normal, low");

    drop(seen);
    executor.stop(Duration::from_millis(300)).await.expect("stop");
}

#[tokio::test]
async fn delayed_delivery_does_not_dequeue_early() {
    let mut dispatcher = DefaultDispatcher::new();
    dispatcher.register_platform(Arc::new(RecordingAdapter::new(
        "email",
        Duration::ZERO,
        Arc::new(Mutex::new(Vec::new())),
    )));
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(dispatcher);

    let executor = Arc::new(AsyncExecutor::new(
        ExecutorConfig { worker_pool: WorkerPoolConfig { min_workers: 1, ..Default::default() }, ..Default::default() },
        dispatcher,
    ));
    executor.start().await;

    let mut message = message_with("delayed", Priority::Normal);
    message.scheduled_at = Some(SystemTime::now() + Duration::from_millis(150));
    let handle = executor.schedule_async(message, AsyncOption::default()).await.expect("schedule");

    let immediate_stats = executor.get_stats().await;
    let queued: usize = immediate_stats.queue.per_priority.iter().sum();
    assert_eq!(queued, 0);
    assert_eq!(immediate_stats.delayed_count, 1);

    tokio::time::sleep(Duration::from_millis(250)).await;
    let receipt = handle.wait(None).await.expect("resolved after promotion");
    assert_eq!(receipt.status, ReceiptStatus::Success);

    executor.stop(Duration::from_millis(300)).await.expect("stop");
}

#[tokio::test]
async fn cancellation_before_pickup_never_dispatches() {
    let in_flight = Arc::new(AtomicU32::new(0));
    let mut dispatcher = DefaultDispatcher::new();
    dispatcher.register_platform(Arc::new(BlockingAdapter { delay: Duration::from_secs(5), in_flight: Arc::clone(&in_flight) }));
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(dispatcher);

    let executor = Arc::new(AsyncExecutor::new(
        ExecutorConfig { worker_pool: WorkerPoolConfig { min_workers: 1, ..Default::default() }, ..Default::default() },
        dispatcher,
    ));
    executor.start().await;

    // Occupy the only worker so the next message sits in the queue,
    // pickable but not yet picked up.
    let occupier = executor.schedule_async(message_with("occupier", Priority::Normal), AsyncOption::default()).await.expect("schedule");

    let target = executor.schedule_async(message_with("target", Priority::Normal), AsyncOption::default()).await.expect("schedule");
    tokio::time::sleep(Duration::from_millis(10)).await;
    target.cancel().expect("not yet terminal");

    let result = target.wait(None).await;
    assert!(result.is_err(), "cancelled handle resolves to an error, not a receipt");
    assert_eq!(target.status().state, notifyhub_domain::HandleState::Cancelled);

    occupier.cancel().ok();
    executor.stop(Duration::from_millis(200)).await.ok();
}

#[tokio::test]
async fn partial_failure_reports_per_target_results() {
    let dispatcher: Arc<dyn Dispatcher> = {
        let mut dispatcher = DefaultDispatcher::new();
        dispatcher.register_platform(Arc::new(SelectiveFailureAdapter { fails: vec!["b@example.com".to_string()] }));
        Arc::new(dispatcher)
    };

    let executor = Arc::new(AsyncExecutor::new(
        ExecutorConfig { worker_pool: WorkerPoolConfig { min_workers: 1, ..Default::default() }, ..Default::default() },
        dispatcher,
    ));
    executor.start().await;

    let message = Message::builder("hi", "there")
        .target(Target::builder("email", "a@example.com", "email").build().expect("target"))
        .target(Target::builder("email", "b@example.com", "email").build().expect("target"))
        .target(Target::builder("email", "c@example.com", "email").build().expect("target"))
        .build()
        .expect("message");

    let handle = executor.schedule_async(message, AsyncOption::default()).await.expect("schedule");
    let receipt = handle.wait(None).await.expect("resolved");

    assert_eq!(receipt.status, ReceiptStatus::Partial);
    assert_eq!(receipt.successful, 2);
    assert_eq!(receipt.failed, 1);
    let failed_result = receipt.results.iter().find(|result| !result.success).expect("one failure");
    assert_eq!(failed_result.target.value, "b@example.com");
    assert_eq!(failed_result.error, "rejected by provider");

    executor.stop(Duration::from_millis(300)).await.expect("stop");
}

#[tokio::test]
async fn autoscaler_grows_under_sustained_load() {
    let in_flight = Arc::new(AtomicU32::new(0));
    let mut dispatcher = DefaultDispatcher::new();
    dispatcher.register_platform(Arc::new(BlockingAdapter { delay: Duration::from_millis(100), in_flight: Arc::clone(&in_flight) }));
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(dispatcher);

    let executor = Arc::new(AsyncExecutor::new(
        ExecutorConfig {
            worker_pool: WorkerPoolConfig {
                min_workers: 2,
                max_workers: 5,
                target_load: 0.5,
                scale_up_delay: Duration::from_millis(50),
                scale_down_delay: Duration::from_millis(50),
                health_check_interval: Duration::from_millis(40),
                boot_batch_size: 2,
                ..Default::default()
            },
            ..Default::default()
        },
        dispatcher,
    ));
    executor.start().await;

    for index in 0..50 {
        executor
            .schedule_async(message_with(&format!("m{index}"), Priority::Normal), AsyncOption::default())
            .await
            .expect("schedule");
    }

    tokio::time::sleep(Duration::from_millis(350)).await;
    let grown_stats = executor.get_stats().await;
    assert!(grown_stats.workers.len() > 2, "expected growth past the floor, saw {}", grown_stats.workers.len());

    executor.stop(Duration::from_millis(500)).await.ok();
}
