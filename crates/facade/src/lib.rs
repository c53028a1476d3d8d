//! # notifyhub-facade
//!
//! Facade API for consumers (CLI today, any future service). Bundles the
//! async executor and a synchronous dispatch path behind a single [`Client`],
//! and re-exports the config/request/error-mapping helpers `notifyhub-infra`
//! and `notifyhub-api` provide so callers need only depend on this crate.
//!
//! This crate depends on `infra`, `api`, `app`, `config`, `domain`, `core`,
//! and `shared`.

use notifyhub_app::{AsyncExecutor, AsyncOption, BatchHandle, CallbackSet, Dispatcher, ExecutorStats, Handle, TimeoutExceeded};
use notifyhub_config::ValidatedNotifyHubConfig;
use notifyhub_domain::{BatchId, Message, MessageId, Receipt};
use notifyhub_ports::PlatformAdapter;
use notifyhub_shared::{ErrorEnvelope, RequestContext, Result as SharedResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub use notifyhub_infra::{
    build_chat_webhook_adapters, build_configured_adapters, build_sms_adapter, build_smtp_adapter, build_webhook_adapter,
    is_secret_key, load_effective_config_from_env_json, load_effective_config_from_path_json, redact_if_secret,
    validate_env_parsing, validate_send_message_request_json, InfraError, InfraResult, SendMessageRequest, TargetRequest,
};

/// API v1 error/DTO re-exports, for CLI/service formatting.
pub use notifyhub_api::v1::{
    batch_handle_to_api_v1, error_envelope_to_api_v1_error, executor_stats_to_api_v1, handle_snapshot_to_api_v1,
    message_request_to_domain, receipt_to_api_v1, result_to_api_v1_result, validate_message_request,
    ApiV1BatchStatusDto, ApiV1ErrorDto, ApiV1ErrorKind, ApiV1ExecutorStatsDto, ApiV1HandleStatusDto,
    ApiV1MessageRequestDto, ApiV1ReceiptDto, ApiV1Result,
};

/// Returns the facade crate version.
#[must_use]
pub const fn facade_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Top-level client bundling the synchronous dispatch path (caller →
/// `Dispatcher` → adapters → `Receipt`, per §2's synchronous control flow)
/// and the asynchronous executor (caller → `AsyncExecutor` → queue/scheduler
/// → worker → `Dispatcher` → `Handle`, per the asynchronous control flow).
///
/// Both paths share the same set of registered platform adapters: the
/// dispatcher the synchronous path calls directly is built from the same
/// adapter list passed to the executor's own internal dispatcher, so
/// `Client::send` and a scheduled message resolve identically.
pub struct Client {
    dispatcher: Arc<dyn Dispatcher>,
    executor: Arc<AsyncExecutor>,
}

impl Client {
    /// Build a client from a validated config and a set of platform
    /// adapters. Does not start the worker pool or delay scheduler — call
    /// [`Client::start`] before scheduling any async work.
    #[must_use]
    pub fn new(config: &ValidatedNotifyHubConfig, adapters: Vec<Arc<dyn PlatformAdapter>>) -> Self {
        let dispatcher: Arc<dyn Dispatcher> = Arc::new(notifyhub_infra::build_dispatcher(adapters.clone()));
        let executor = notifyhub_infra::build_executor(config, adapters);
        Self { dispatcher, executor }
    }

    /// Start the executor's worker pool, delay scheduler, and bridge task.
    /// Idempotent.
    pub async fn start(&self) {
        self.executor.start().await;
    }

    /// Stop the executor, draining in-flight work within `timeout`.
    ///
    /// # Errors
    /// Propagates [`TimeoutExceeded`] if the worker pool's drain window
    /// elapses with stragglers still running.
    pub async fn stop(&self, timeout: Duration) -> std::result::Result<(), TimeoutExceeded> {
        self.executor.stop(timeout).await
    }

    /// Synchronous send: dispatch `message` directly to its resolved
    /// adapters and return the aggregated [`Receipt`], bypassing the queue
    /// and worker pool entirely.
    ///
    /// # Errors
    /// Returns an error if `message` has no targets; per-target adapter
    /// failures are reported inside the `Receipt`, not as an outer error.
    pub async fn send(&self, message: &Message) -> SharedResult<Receipt> {
        let ctx = RequestContext::new_request();
        self.dispatcher.dispatch(&ctx, message).await
    }

    /// Synchronous send honoring a caller-supplied [`RequestContext`]
    /// (timeout/cancellation propagated to every adapter call).
    ///
    /// # Errors
    /// See [`Client::send`].
    pub async fn send_with_context(&self, ctx: &RequestContext, message: &Message) -> SharedResult<Receipt> {
        self.dispatcher.dispatch(ctx, message).await
    }

    /// Liveness check across every registered platform adapter.
    pub async fn health(&self) -> HashMap<String, SharedResult<()>> {
        let ctx = RequestContext::new_request();
        self.dispatcher.health(&ctx).await
    }

    /// Schedule one message for asynchronous delivery. Returns the
    /// [`Handle`] the caller observes, waits on, or cancels.
    ///
    /// # Errors
    /// Propagates handle-registry capacity errors and queue-admission
    /// errors (full/closed).
    pub async fn schedule(&self, message: Message, options: AsyncOption) -> SharedResult<Arc<Handle>> {
        self.executor.schedule_async(message, options).await
    }

    /// Schedule a batch of messages as one unit.
    ///
    /// # Errors
    /// Returns a validation error for an empty batch; otherwise propagates
    /// handle-registry/queue-admission errors.
    pub async fn schedule_batch(&self, messages: Vec<Message>, options: AsyncOption) -> SharedResult<Arc<BatchHandle>> {
        self.executor.schedule_batch(messages, options).await
    }

    /// Grow the worker pool toward `target` workers.
    pub async fn scale_workers(self: &Arc<Self>, target: usize) {
        self.executor.scale_workers(target).await;
    }

    /// Combined operational snapshot across every executor subsystem.
    pub async fn stats(&self) -> ExecutorStats {
        self.executor.get_stats().await
    }

    /// Register a callback set applied to every message/batch's lifecycle
    /// events, in addition to any per-message/per-batch set passed via
    /// [`AsyncOption::callbacks`].
    pub async fn register_global_callbacks(&self, callbacks: CallbackSet) {
        self.executor.register_global_callbacks(callbacks).await;
    }

    /// Look up a tracked [`Handle`] by message id, for operational tooling.
    pub async fn handle(&self, message_id: &MessageId) -> Option<Arc<Handle>> {
        self.executor.get_handle(message_id).await
    }

    /// Look up a tracked [`BatchHandle`] by batch id, for operational tooling.
    pub async fn batch(&self, batch_id: &BatchId) -> Option<Arc<BatchHandle>> {
        self.executor.get_batch(batch_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifyhub_config::NotifyHubConfig;
    use notifyhub_domain::Target;
    use notifyhub_testkit::in_memory::MockPlatformAdapter;
    use std::time::Duration;

    fn config() -> ValidatedNotifyHubConfig {
        let mut raw = NotifyHubConfig::default();
        raw.worker_pool.min_workers = 1;
        raw.worker_pool.max_workers = 2;
        raw.validate_and_normalize().expect("valid config")
    }

    fn message() -> Message {
        Message::builder("hi", "there")
            .target(Target::builder("email", "a@example.com", "mock").build().expect("target"))
            .build()
            .expect("message")
    }

    #[test]
    fn facade_crate_compiles() {
        assert!(!facade_crate_version().is_empty());
    }

    #[tokio::test]
    async fn client_send_dispatches_synchronously() {
        let adapter: Arc<dyn PlatformAdapter> = Arc::new(MockPlatformAdapter::new("mock"));
        let client = Client::new(&config(), vec![adapter]);

        let receipt = client.send(&message()).await.expect("dispatch");
        assert_eq!(receipt.total, 1);
        assert_eq!(receipt.successful, 1);
    }

    #[tokio::test]
    async fn client_schedule_resolves_through_executor() {
        let adapter: Arc<dyn PlatformAdapter> = Arc::new(MockPlatformAdapter::new("mock"));
        let client = Client::new(&config(), vec![adapter]);
        client.start().await;

        let handle = client.schedule(message(), AsyncOption::default()).await.expect("schedule");
        let result = handle.wait(None).await;
        assert!(result.is_ok());

        client.stop(Duration::from_millis(300)).await.expect("stop");
    }

    #[tokio::test]
    async fn client_exposes_handle_lookup() {
        let adapter: Arc<dyn PlatformAdapter> = Arc::new(MockPlatformAdapter::new("mock"));
        let client = Client::new(&config(), vec![adapter]);
        client.start().await;

        let message = message();
        let message_id = message.id.clone();
        let handle = client.schedule(message, AsyncOption::default()).await.expect("schedule");
        let _ = handle.wait(None).await;

        let looked_up = client.handle(&message_id).await;
        assert!(looked_up.is_some());

        client.stop(Duration::from_millis(300)).await.expect("stop");
    }
}
