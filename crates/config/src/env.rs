//! Environment variable parsing and env-to-config merging.
//!
//! This module keeps env parsing:
//! - strict (invalid values fail fast)
//! - deterministic (unknown keys are ignored, known keys always win the same way)
//! - explicit (every recognized variable is a named constant, not a convention)

use crate::schema::{
    AsyncOptionDefaults, CallbackExecutorConfig, CallbackRetryConfig, ConfigPriority, HandleRegistryConfig, LoadBalancerKind,
    NotifyHubConfig, QueueConfig, WorkerPoolConfig,
};
use notifyhub_shared::{ErrorCode, ErrorEnvelope};
use std::collections::BTreeMap;
use std::fmt;

/// Env var: queue capacity.
pub const ENV_QUEUE_CAPACITY: &str = "NOTIFYHUB_QUEUE_CAPACITY";
/// Env var: whether delayed delivery is enabled.
pub const ENV_QUEUE_DELAYED_ENABLED: &str = "NOTIFYHUB_QUEUE_DELAYED_ENABLED";

/// Env var: minimum worker pool size.
pub const ENV_WORKER_POOL_MIN_WORKERS: &str = "NOTIFYHUB_WORKER_POOL_MIN_WORKERS";
/// Env var: maximum worker pool size.
pub const ENV_WORKER_POOL_MAX_WORKERS: &str = "NOTIFYHUB_WORKER_POOL_MAX_WORKERS";
/// Env var: target load fraction.
pub const ENV_WORKER_POOL_TARGET_LOAD: &str = "NOTIFYHUB_WORKER_POOL_TARGET_LOAD";
/// Env var: scale-up delay in milliseconds.
pub const ENV_WORKER_POOL_SCALE_UP_DELAY_MS: &str = "NOTIFYHUB_WORKER_POOL_SCALE_UP_DELAY_MS";
/// Env var: scale-down delay in milliseconds.
pub const ENV_WORKER_POOL_SCALE_DOWN_DELAY_MS: &str = "NOTIFYHUB_WORKER_POOL_SCALE_DOWN_DELAY_MS";
/// Env var: health check interval in milliseconds.
pub const ENV_WORKER_POOL_HEALTH_CHECK_INTERVAL_MS: &str = "NOTIFYHUB_WORKER_POOL_HEALTH_CHECK_INTERVAL_MS";
/// Env var: maximum idle time in milliseconds.
pub const ENV_WORKER_POOL_MAX_IDLE_TIME_MS: &str = "NOTIFYHUB_WORKER_POOL_MAX_IDLE_TIME_MS";
/// Env var: task batch size.
pub const ENV_WORKER_POOL_TASK_BATCH_SIZE: &str = "NOTIFYHUB_WORKER_POOL_TASK_BATCH_SIZE";
/// Env var: batch window in milliseconds.
pub const ENV_WORKER_POOL_BATCH_WINDOW_MS: &str = "NOTIFYHUB_WORKER_POOL_BATCH_WINDOW_MS";
/// Env var: boot batch size.
pub const ENV_WORKER_POOL_BOOT_BATCH_SIZE: &str = "NOTIFYHUB_WORKER_POOL_BOOT_BATCH_SIZE";
/// Env var: boot batch pause in milliseconds.
pub const ENV_WORKER_POOL_BOOT_BATCH_PAUSE_MS: &str = "NOTIFYHUB_WORKER_POOL_BOOT_BATCH_PAUSE_MS";

/// Env var: callback executor worker count.
pub const ENV_CALLBACK_EXECUTOR_WORKERS: &str = "NOTIFYHUB_CALLBACK_EXECUTOR_WORKERS";
/// Env var: callback queue capacity.
pub const ENV_CALLBACK_QUEUE_CAPACITY: &str = "NOTIFYHUB_CALLBACK_QUEUE_CAPACITY";
/// Env var: callback dead-letter capacity.
pub const ENV_CALLBACK_DEAD_LETTER_CAPACITY: &str = "NOTIFYHUB_CALLBACK_DEAD_LETTER_CAPACITY";
/// Env var: callback retry max attempts.
pub const ENV_CALLBACK_RETRY_MAX_RETRIES: &str = "NOTIFYHUB_CALLBACK_RETRY_MAX_RETRIES";
/// Env var: callback retry initial interval in milliseconds.
pub const ENV_CALLBACK_RETRY_INITIAL_INTERVAL_MS: &str = "NOTIFYHUB_CALLBACK_RETRY_INITIAL_INTERVAL_MS";
/// Env var: callback retry backoff multiplier.
pub const ENV_CALLBACK_RETRY_MULTIPLIER: &str = "NOTIFYHUB_CALLBACK_RETRY_MULTIPLIER";
/// Env var: callback retry max interval in milliseconds.
pub const ENV_CALLBACK_RETRY_MAX_INTERVAL_MS: &str = "NOTIFYHUB_CALLBACK_RETRY_MAX_INTERVAL_MS";
/// Env var: callback retry jitter toggle.
pub const ENV_CALLBACK_RETRY_JITTER: &str = "NOTIFYHUB_CALLBACK_RETRY_JITTER";
/// Env var: callback execution record TTL in seconds.
pub const ENV_CALLBACK_RECORD_TTL_SECS: &str = "NOTIFYHUB_CALLBACK_RECORD_TTL_SECS";
/// Env var: whether both per-message and global callbacks fire.
pub const ENV_CALLBACK_FIRE_BOTH: &str = "NOTIFYHUB_CALLBACK_FIRE_BOTH";

/// Env var: handle registry capacity.
pub const ENV_HANDLE_REGISTRY_CAPACITY: &str = "NOTIFYHUB_HANDLE_REGISTRY_CAPACITY";
/// Env var: handle registry TTL in seconds.
pub const ENV_HANDLE_REGISTRY_TTL_SECS: &str = "NOTIFYHUB_HANDLE_REGISTRY_TTL_SECS";

/// Env var: default message priority applied when a caller does not set one.
pub const ENV_ASYNC_DEFAULT_PRIORITY: &str = "NOTIFYHUB_ASYNC_DEFAULT_PRIORITY";
/// Env var: default soft wait timeout in milliseconds.
pub const ENV_ASYNC_DEFAULT_TIMEOUT_MS: &str = "NOTIFYHUB_ASYNC_DEFAULT_TIMEOUT_MS";

/// Env var: load balancer strategy.
pub const ENV_LOAD_BALANCER: &str = "NOTIFYHUB_LOAD_BALANCER";

/// A map of env-var name to raw string value, used both for the real process
/// environment and for deterministic tests.
pub type EnvMap = BTreeMap<String, String>;

/// Typed, partial overrides sourced from environment variables. Every field
/// is `None` unless its corresponding variable was set and parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotifyHubEnv {
    queue_capacity: Option<u32>,
    queue_delayed_enabled: Option<bool>,
    worker_pool_min_workers: Option<u32>,
    worker_pool_max_workers: Option<u32>,
    worker_pool_target_load: Option<f64>,
    worker_pool_scale_up_delay_ms: Option<u64>,
    worker_pool_scale_down_delay_ms: Option<u64>,
    worker_pool_health_check_interval_ms: Option<u64>,
    worker_pool_max_idle_time_ms: Option<u64>,
    worker_pool_task_batch_size: Option<u32>,
    worker_pool_batch_window_ms: Option<u64>,
    worker_pool_boot_batch_size: Option<u32>,
    worker_pool_boot_batch_pause_ms: Option<u64>,
    callback_executor_workers: Option<u32>,
    callback_queue_capacity: Option<u32>,
    callback_dead_letter_capacity: Option<u32>,
    callback_retry_max_retries: Option<u32>,
    callback_retry_initial_interval_ms: Option<u64>,
    callback_retry_multiplier: Option<f64>,
    callback_retry_max_interval_ms: Option<u64>,
    callback_retry_jitter: Option<bool>,
    callback_record_ttl_secs: Option<u64>,
    callback_fire_both: Option<bool>,
    handle_registry_capacity: Option<u32>,
    handle_registry_ttl_secs: Option<u64>,
    async_default_priority: Option<ConfigPriority>,
    async_default_timeout_ms: Option<u64>,
    load_balancer: Option<LoadBalancerKind>,
}

impl NotifyHubEnv {
    /// Parse overrides out of an explicit env map (used by tests and any
    /// caller that builds its own environment snapshot).
    ///
    /// # Errors
    /// Returns an [`ErrorEnvelope`] describing the first variable that
    /// failed to parse.
    pub fn from_map(env: &EnvMap) -> Result<Self, ErrorEnvelope> {
        let mut reader = EnvReader { env };
        Ok(Self {
            queue_capacity: reader.read_u32(ENV_QUEUE_CAPACITY)?,
            queue_delayed_enabled: reader.read_bool(ENV_QUEUE_DELAYED_ENABLED)?,
            worker_pool_min_workers: reader.read_u32(ENV_WORKER_POOL_MIN_WORKERS)?,
            worker_pool_max_workers: reader.read_u32(ENV_WORKER_POOL_MAX_WORKERS)?,
            worker_pool_target_load: reader.read_f64(ENV_WORKER_POOL_TARGET_LOAD)?,
            worker_pool_scale_up_delay_ms: reader.read_u64(ENV_WORKER_POOL_SCALE_UP_DELAY_MS)?,
            worker_pool_scale_down_delay_ms: reader.read_u64(ENV_WORKER_POOL_SCALE_DOWN_DELAY_MS)?,
            worker_pool_health_check_interval_ms: reader.read_u64(ENV_WORKER_POOL_HEALTH_CHECK_INTERVAL_MS)?,
            worker_pool_max_idle_time_ms: reader.read_u64(ENV_WORKER_POOL_MAX_IDLE_TIME_MS)?,
            worker_pool_task_batch_size: reader.read_u32(ENV_WORKER_POOL_TASK_BATCH_SIZE)?,
            worker_pool_batch_window_ms: reader.read_u64(ENV_WORKER_POOL_BATCH_WINDOW_MS)?,
            worker_pool_boot_batch_size: reader.read_u32(ENV_WORKER_POOL_BOOT_BATCH_SIZE)?,
            worker_pool_boot_batch_pause_ms: reader.read_u64(ENV_WORKER_POOL_BOOT_BATCH_PAUSE_MS)?,
            callback_executor_workers: reader.read_u32(ENV_CALLBACK_EXECUTOR_WORKERS)?,
            callback_queue_capacity: reader.read_u32(ENV_CALLBACK_QUEUE_CAPACITY)?,
            callback_dead_letter_capacity: reader.read_u32(ENV_CALLBACK_DEAD_LETTER_CAPACITY)?,
            callback_retry_max_retries: reader.read_u32(ENV_CALLBACK_RETRY_MAX_RETRIES)?,
            callback_retry_initial_interval_ms: reader.read_u64(ENV_CALLBACK_RETRY_INITIAL_INTERVAL_MS)?,
            callback_retry_multiplier: reader.read_f64(ENV_CALLBACK_RETRY_MULTIPLIER)?,
            callback_retry_max_interval_ms: reader.read_u64(ENV_CALLBACK_RETRY_MAX_INTERVAL_MS)?,
            callback_retry_jitter: reader.read_bool(ENV_CALLBACK_RETRY_JITTER)?,
            callback_record_ttl_secs: reader.read_u64(ENV_CALLBACK_RECORD_TTL_SECS)?,
            callback_fire_both: reader.read_bool(ENV_CALLBACK_FIRE_BOTH)?,
            handle_registry_capacity: reader.read_u32(ENV_HANDLE_REGISTRY_CAPACITY)?,
            handle_registry_ttl_secs: reader.read_u64(ENV_HANDLE_REGISTRY_TTL_SECS)?,
            async_default_priority: reader.read_priority(ENV_ASYNC_DEFAULT_PRIORITY)?,
            async_default_timeout_ms: reader.read_u64(ENV_ASYNC_DEFAULT_TIMEOUT_MS)?,
            load_balancer: reader.read_load_balancer(ENV_LOAD_BALANCER)?,
        })
    }

    /// Parse overrides out of the real process environment.
    ///
    /// # Errors
    /// Returns an [`ErrorEnvelope`] describing the first variable that
    /// failed to parse.
    pub fn from_std_env() -> Result<Self, ErrorEnvelope> {
        let snapshot: EnvMap = std::env::vars().collect();
        Self::from_map(&snapshot)
    }

    /// Apply these overrides onto `base`, returning the merged config.
    /// Every field present here wins over the value already in `base`.
    #[must_use]
    pub fn apply(&self, mut base: NotifyHubConfig) -> NotifyHubConfig {
        apply_queue(&mut base.queue, self);
        apply_worker_pool(&mut base.worker_pool, self);
        apply_callback_executor(&mut base.callback_executor, self);
        apply_handle_registry(&mut base.handle_registry, self);
        apply_async_options(&mut base.async_options, self);
        if let Some(load_balancer) = self.load_balancer {
            base.load_balancer = load_balancer;
        }
        base
    }
}

fn apply_queue(queue: &mut QueueConfig, env: &NotifyHubEnv) {
    if let Some(value) = env.queue_capacity {
        queue.capacity = value;
    }
    if let Some(value) = env.queue_delayed_enabled {
        queue.delayed_enabled = value;
    }
}

fn apply_worker_pool(pool: &mut WorkerPoolConfig, env: &NotifyHubEnv) {
    if let Some(value) = env.worker_pool_min_workers {
        pool.min_workers = value;
    }
    if let Some(value) = env.worker_pool_max_workers {
        pool.max_workers = value;
    }
    if let Some(value) = env.worker_pool_target_load {
        pool.target_load = value;
    }
    if let Some(value) = env.worker_pool_scale_up_delay_ms {
        pool.scale_up_delay_ms = value;
    }
    if let Some(value) = env.worker_pool_scale_down_delay_ms {
        pool.scale_down_delay_ms = value;
    }
    if let Some(value) = env.worker_pool_health_check_interval_ms {
        pool.health_check_interval_ms = value;
    }
    if let Some(value) = env.worker_pool_max_idle_time_ms {
        pool.max_idle_time_ms = value;
    }
    if let Some(value) = env.worker_pool_task_batch_size {
        pool.task_batch_size = value;
    }
    if let Some(value) = env.worker_pool_batch_window_ms {
        pool.batch_window_ms = value;
    }
    if let Some(value) = env.worker_pool_boot_batch_size {
        pool.boot_batch_size = value;
    }
    if let Some(value) = env.worker_pool_boot_batch_pause_ms {
        pool.boot_batch_pause_ms = value;
    }
}

fn apply_callback_executor(executor: &mut CallbackExecutorConfig, env: &NotifyHubEnv) {
    if let Some(value) = env.callback_executor_workers {
        executor.executor_workers = value;
    }
    if let Some(value) = env.callback_queue_capacity {
        executor.queue_capacity = value;
    }
    if let Some(value) = env.callback_dead_letter_capacity {
        executor.dead_letter_capacity = value;
    }
    if let Some(value) = env.callback_record_ttl_secs {
        executor.record_ttl_secs = value;
    }
    if let Some(value) = env.callback_fire_both {
        executor.fire_both = value;
    }
    apply_callback_retry(&mut executor.retry, env);
}

fn apply_callback_retry(retry: &mut CallbackRetryConfig, env: &NotifyHubEnv) {
    if let Some(value) = env.callback_retry_max_retries {
        retry.max_retries = value;
    }
    if let Some(value) = env.callback_retry_initial_interval_ms {
        retry.initial_interval_ms = value;
    }
    if let Some(value) = env.callback_retry_multiplier {
        retry.multiplier = value;
    }
    if let Some(value) = env.callback_retry_max_interval_ms {
        retry.max_interval_ms = value;
    }
    if let Some(value) = env.callback_retry_jitter {
        retry.jitter = value;
    }
}

fn apply_handle_registry(registry: &mut HandleRegistryConfig, env: &NotifyHubEnv) {
    if let Some(value) = env.handle_registry_capacity {
        registry.capacity = value;
    }
    if let Some(value) = env.handle_registry_ttl_secs {
        registry.ttl_secs = value;
    }
}

fn apply_async_options(options: &mut AsyncOptionDefaults, env: &NotifyHubEnv) {
    if let Some(value) = env.async_default_priority {
        options.default_priority = value;
    }
    if let Some(value) = env.async_default_timeout_ms {
        options.default_timeout_ms = Some(value);
    }
}

struct EnvReader<'a> {
    env: &'a EnvMap,
}

impl EnvReader<'_> {
    fn raw(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    fn read_u32(&mut self, key: &'static str) -> Result<Option<u32>, ErrorEnvelope> {
        self.raw(key).map(|value| parse_env_value(key, value)).transpose()
    }

    fn read_u64(&mut self, key: &'static str) -> Result<Option<u64>, ErrorEnvelope> {
        self.raw(key).map(|value| parse_env_value(key, value)).transpose()
    }

    fn read_f64(&mut self, key: &'static str) -> Result<Option<f64>, ErrorEnvelope> {
        self.raw(key).map(|value| parse_env_value(key, value)).transpose()
    }

    fn read_bool(&mut self, key: &'static str) -> Result<Option<bool>, ErrorEnvelope> {
        self.raw(key)
            .map(|value| match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(env_parse_error(key, value, "bool")),
            })
            .transpose()
    }

    fn read_priority(&mut self, key: &'static str) -> Result<Option<ConfigPriority>, ErrorEnvelope> {
        self.raw(key)
            .map(|value| match value.trim().to_ascii_lowercase().as_str() {
                "low" => Ok(ConfigPriority::Low),
                "normal" => Ok(ConfigPriority::Normal),
                "high" => Ok(ConfigPriority::High),
                "urgent" => Ok(ConfigPriority::Urgent),
                _ => Err(env_parse_error(key, value, "priority (low|normal|high|urgent)")),
            })
            .transpose()
    }

    fn read_load_balancer(&mut self, key: &'static str) -> Result<Option<LoadBalancerKind>, ErrorEnvelope> {
        self.raw(key)
            .map(|value| LoadBalancerKind::parse(value).ok_or_else(|| env_parse_error(key, value, "load balancer strategy")))
            .transpose()
    }
}

fn parse_env_value<T>(key: &'static str, value: &str) -> Result<T, ErrorEnvelope>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse::<T>().map_err(|error| {
        ErrorEnvelope::expected(ErrorCode::new("config", "invalid_env_value"), format!("invalid value for {key}: {error}"))
            .with_metadata("variable", key)
            .with_metadata("value", value)
    })
}

fn env_parse_error(key: &'static str, value: &str, expected: &str) -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::new("config", "invalid_env_value"), format!("invalid value for {key}: expected {expected}, got '{value}'"))
        .with_metadata("variable", key)
        .with_metadata("value", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_map(pairs: &[(&str, &str)]) -> EnvMap {
        pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect()
    }

    #[test]
    fn empty_env_yields_no_overrides() {
        let env = NotifyHubEnv::from_map(&EnvMap::new()).expect("parse");
        assert_eq!(env, NotifyHubEnv::default());
    }

    #[test]
    fn parses_known_numeric_and_bool_vars() {
        let map = env_map(&[
            (ENV_QUEUE_CAPACITY, "2000"),
            (ENV_QUEUE_DELAYED_ENABLED, "false"),
            (ENV_WORKER_POOL_TARGET_LOAD, "0.5"),
            (ENV_CALLBACK_FIRE_BOTH, "yes"),
        ]);
        let env = NotifyHubEnv::from_map(&map).expect("parse");
        assert_eq!(env.queue_capacity, Some(2000));
        assert_eq!(env.queue_delayed_enabled, Some(false));
        assert_eq!(env.worker_pool_target_load, Some(0.5));
        assert_eq!(env.callback_fire_both, Some(true));
    }

    #[test]
    fn rejects_invalid_numeric_value() {
        let map = env_map(&[(ENV_QUEUE_CAPACITY, "not-a-number")]);
        assert!(NotifyHubEnv::from_map(&map).is_err());
    }

    #[test]
    fn rejects_unknown_priority_value() {
        let map = env_map(&[(ENV_ASYNC_DEFAULT_PRIORITY, "medium")]);
        assert!(NotifyHubEnv::from_map(&map).is_err());
    }

    #[test]
    fn apply_overrides_only_present_fields() {
        let map = env_map(&[(ENV_WORKER_POOL_MAX_WORKERS, "50")]);
        let env = NotifyHubEnv::from_map(&map).expect("parse");
        let merged = env.apply(NotifyHubConfig::default());
        assert_eq!(merged.worker_pool.max_workers, 50);
        assert_eq!(merged.worker_pool.min_workers, NotifyHubConfig::default().worker_pool.min_workers);
    }
}
