//! Composition root: turns a validated [`notifyhub_config::NotifyHubConfig`]
//! into the concrete [`notifyhub_app`] types, and wires a set of platform
//! adapters into a running [`AsyncExecutor`].
//!
//! `notifyhub-config` mirrors `notifyhub-app`'s config structs field-for-field
//! but with `u32`/millisecond-`u64` shapes instead of `usize`/`Duration` (so
//! the schema stays `schemars`-exportable without depending on `app`). This
//! module is the one place that bridges the two.

use notifyhub_app::{
    AsyncExecutor, CallbackRegistryConfig, CallbackRetryPolicy, DefaultDispatcher, Dispatcher, ExecutorConfig,
    LoadBalancerStrategy, WorkerPoolConfig,
};
use notifyhub_config::{CallbackExecutorConfig, CallbackRetryConfig, LoadBalancerKind, ValidatedNotifyHubConfig};
use notifyhub_ports::PlatformAdapter;
use std::sync::Arc;
use std::time::Duration;

/// Convert a validated [`notifyhub_config::NotifyHubConfig`] into the
/// [`ExecutorConfig`] `notifyhub-app` expects.
#[must_use]
pub fn executor_config_from(config: &ValidatedNotifyHubConfig) -> ExecutorConfig {
    let raw = config.as_ref();
    ExecutorConfig {
        queue_capacity: raw.queue.capacity as usize,
        worker_pool: worker_pool_config_from(&raw.worker_pool),
        callback_registry: callback_registry_config_from(&raw.callback_executor),
        load_balancer: load_balancer_strategy_from(raw.load_balancer),
        handle_capacity: raw.handle_registry.capacity as usize,
        handle_ttl: Duration::from_secs(raw.handle_registry.ttl_secs),
    }
}

fn worker_pool_config_from(config: &notifyhub_config::WorkerPoolConfig) -> WorkerPoolConfig {
    WorkerPoolConfig {
        min_workers: config.min_workers as usize,
        max_workers: config.max_workers as usize,
        target_load: config.target_load,
        scale_up_delay: Duration::from_millis(config.scale_up_delay_ms),
        scale_down_delay: Duration::from_millis(config.scale_down_delay_ms),
        health_check_interval: Duration::from_millis(config.health_check_interval_ms),
        max_idle_time: Duration::from_millis(config.max_idle_time_ms),
        task_batch_size: config.task_batch_size as usize,
        batch_window: Duration::from_millis(config.batch_window_ms),
        boot_batch_size: config.boot_batch_size as usize,
        boot_batch_pause: Duration::from_millis(config.boot_batch_pause_ms),
    }
}

fn callback_registry_config_from(config: &CallbackExecutorConfig) -> CallbackRegistryConfig {
    CallbackRegistryConfig {
        executor_workers: config.executor_workers as usize,
        queue_capacity: config.queue_capacity as usize,
        dead_letter_capacity: config.dead_letter_capacity as usize,
        default_retry_policy: callback_retry_policy_from(&config.retry),
        record_ttl: Duration::from_secs(config.record_ttl_secs),
    }
}

fn callback_retry_policy_from(config: &CallbackRetryConfig) -> CallbackRetryPolicy {
    CallbackRetryPolicy {
        max_retries: config.max_retries,
        initial_interval: Duration::from_millis(config.initial_interval_ms),
        multiplier: config.multiplier,
        max_interval: Duration::from_millis(config.max_interval_ms),
        jitter: config.jitter,
    }
}

const fn load_balancer_strategy_from(kind: LoadBalancerKind) -> LoadBalancerStrategy {
    match kind {
        LoadBalancerKind::RoundRobin => LoadBalancerStrategy::RoundRobin,
        LoadBalancerKind::LeastConnections => LoadBalancerStrategy::LeastConnections,
        LoadBalancerKind::Weighted => LoadBalancerStrategy::Weighted,
        LoadBalancerKind::Affinity => LoadBalancerStrategy::Affinity,
    }
}

/// Build a [`DefaultDispatcher`] with every adapter in `adapters` registered
/// under its own [`PlatformAdapter::name`].
#[must_use]
pub fn build_dispatcher(adapters: Vec<Arc<dyn PlatformAdapter>>) -> DefaultDispatcher {
    let mut dispatcher = DefaultDispatcher::new();
    for adapter in adapters {
        dispatcher.register_platform(adapter);
    }
    dispatcher
}

/// Build a ready-to-[`AsyncExecutor::start`] executor from a validated
/// config and a set of platform adapters. Does not itself call `start` —
/// callers decide when the worker pool and delay scheduler boot.
#[must_use]
pub fn build_executor(config: &ValidatedNotifyHubConfig, adapters: Vec<Arc<dyn PlatformAdapter>>) -> Arc<AsyncExecutor> {
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(build_dispatcher(adapters));
    Arc::new(AsyncExecutor::new(executor_config_from(config), dispatcher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifyhub_config::NotifyHubConfig;

    #[test]
    fn executor_config_conversion_preserves_values() {
        let mut raw = NotifyHubConfig::default();
        raw.worker_pool.min_workers = 3;
        raw.worker_pool.max_workers = 7;
        raw.worker_pool.scale_up_delay_ms = 1_500;
        raw.callback_executor.executor_workers = 4;
        raw.callback_executor.retry.max_retries = 9;
        raw.load_balancer = LoadBalancerKind::Affinity;
        let validated = raw.validate_and_normalize().expect("valid");

        let executor_config = executor_config_from(&validated);
        assert_eq!(executor_config.worker_pool.min_workers, 3);
        assert_eq!(executor_config.worker_pool.max_workers, 7);
        assert_eq!(executor_config.worker_pool.scale_up_delay, Duration::from_millis(1_500));
        assert_eq!(executor_config.callback_registry.executor_workers, 4);
        assert_eq!(executor_config.callback_registry.default_retry_policy.max_retries, 9);
        assert!(matches!(executor_config.load_balancer, LoadBalancerStrategy::Affinity));
    }

    #[test]
    fn build_dispatcher_registers_every_adapter() {
        let dispatcher = build_dispatcher(Vec::new());
        assert_eq!(dispatcher.adapter_count(), 0);
    }

    #[test]
    fn build_executor_does_not_panic_with_no_adapters() {
        let config = NotifyHubConfig::default().validate_and_normalize().expect("valid");
        let _executor = build_executor(&config, Vec::new());
    }
}
