//! NotifyHub configuration schema, defaults, validation, and normalization.
//!
//! Mirrors the config types `notifyhub-app` already defines
//! (`WorkerPoolConfig`, `CallbackRegistryConfig`, `CallbackRetryPolicy`) as a
//! serializable, schema-exportable shape. `notifyhub-config` never depends on
//! `notifyhub-app` — `notifyhub-infra` is responsible for converting a
//! validated `NotifyHubConfig` into the concrete `app` config structs at
//! composition time.

use notifyhub_domain::Priority;
use notifyhub_shared::{ErrorCode, ErrorEnvelope};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current supported configuration schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

const QUEUE_CAPACITY_MIN: u32 = 1;
const QUEUE_CAPACITY_MAX: u32 = 1_000_000;

const WORKER_MIN_MIN: u32 = 1;
const WORKER_MAX_MAX: u32 = 10_000;
const TARGET_LOAD_MIN: f64 = 0.0;
const TARGET_LOAD_MAX: f64 = 1.0;
const DURATION_MS_MIN: u64 = 0;
const DURATION_MS_MAX: u64 = 3_600_000;
const TASK_BATCH_SIZE_MIN: u32 = 1;
const TASK_BATCH_SIZE_MAX: u32 = 10_000;

const CALLBACK_WORKERS_MIN: u32 = 1;
const CALLBACK_WORKERS_MAX: u32 = 10_000;
const CALLBACK_QUEUE_CAPACITY_MIN: u32 = 1;
const CALLBACK_QUEUE_CAPACITY_MAX: u32 = 1_000_000;
const DEAD_LETTER_CAPACITY_MIN: u32 = 0;
const DEAD_LETTER_CAPACITY_MAX: u32 = 1_000_000;
const RETRY_MAX_RETRIES_MIN: u32 = 0;
const RETRY_MAX_RETRIES_MAX: u32 = 20;
const RETRY_MULTIPLIER_MIN: f64 = 1.0;
const RETRY_MULTIPLIER_MAX: f64 = 10.0;

const HANDLE_CAPACITY_MIN: u32 = 1;
const HANDLE_CAPACITY_MAX: u32 = 1_000_000;
const HANDLE_TTL_SECS_MIN: u64 = 1;
const HANDLE_TTL_SECS_MAX: u64 = 86_400;

/// Top-level NotifyHub configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct NotifyHubConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// Priority/delay queue settings.
    pub queue: QueueConfig,
    /// Elastic worker pool settings.
    pub worker_pool: WorkerPoolConfig,
    /// Callback registry/executor settings.
    pub callback_executor: CallbackExecutorConfig,
    /// Handle registry settings.
    pub handle_registry: HandleRegistryConfig,
    /// Defaults applied to `AsyncOption` when a caller does not override them.
    pub async_options: AsyncOptionDefaults,
    /// Strategy the worker pool uses to route drained batches to workers.
    pub load_balancer: LoadBalancerKind,
}

impl Default for NotifyHubConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            queue: QueueConfig::default(),
            worker_pool: WorkerPoolConfig::default(),
            callback_executor: CallbackExecutorConfig::default(),
            handle_registry: HandleRegistryConfig::default(),
            async_options: AsyncOptionDefaults::default(),
            load_balancer: LoadBalancerKind::LeastConnections,
        }
    }
}

impl NotifyHubConfig {
    /// Validate and normalize the config.
    ///
    /// # Errors
    /// Returns a [`ConfigSchemaError`] describing the first invalid field
    /// encountered.
    pub fn validate_and_normalize(self) -> Result<ValidatedNotifyHubConfig, ConfigSchemaError> {
        self.validate_version()?;
        self.queue.validate()?;
        self.worker_pool.validate()?;
        self.callback_executor.validate()?;
        self.handle_registry.validate()?;
        Ok(ValidatedNotifyHubConfig { raw: self })
    }

    const fn validate_version(&self) -> Result<(), ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion { found: self.version, supported: CURRENT_CONFIG_VERSION });
        }
        Ok(())
    }
}

/// A config known to have passed [`NotifyHubConfig::validate_and_normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedNotifyHubConfig {
    raw: NotifyHubConfig,
}

impl ValidatedNotifyHubConfig {
    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &NotifyHubConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> NotifyHubConfig {
        self.raw
    }
}

impl AsRef<NotifyHubConfig> for ValidatedNotifyHubConfig {
    fn as_ref(&self) -> &NotifyHubConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedNotifyHubConfig {
    type Target = NotifyHubConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Parse a [`NotifyHubConfig`] from a JSON string, applying validation.
///
/// # Errors
/// Returns an [`ErrorEnvelope`] if the input is not valid JSON or fails
/// schema validation.
pub fn parse_notifyhub_config_json(input: &str) -> Result<ValidatedNotifyHubConfig, ErrorEnvelope> {
    let config: NotifyHubConfig = serde_json::from_str(input)
        .map_err(|error| ErrorEnvelope::expected(ErrorCode::new("config", "invalid_json"), format!("invalid config JSON: {error}")))?;
    config.validate_and_normalize().map_err(Into::into)
}

/// Parse a [`NotifyHubConfig`] from a TOML string, applying validation.
///
/// # Errors
/// Returns an [`ErrorEnvelope`] if the input is not valid TOML or fails
/// schema validation.
pub fn parse_notifyhub_config_toml(input: &str) -> Result<ValidatedNotifyHubConfig, ErrorEnvelope> {
    let config: NotifyHubConfig = toml::from_str(input)
        .map_err(|error| ErrorEnvelope::expected(ErrorCode::new("config", "invalid_toml"), format!("invalid config TOML: {error}")))?;
    config.validate_and_normalize().map_err(Into::into)
}

/// Priority + delay queue configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct QueueConfig {
    /// Bounded capacity shared by the immediate queue and the delay
    /// scheduler's promotion queue.
    pub capacity: u32,
    /// Whether messages carrying a future `scheduled_at` are held by the
    /// delay scheduler. When `false`, scheduling is rejected up front.
    pub delayed_enabled: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 1000, delayed_enabled: true }
    }
}

impl QueueConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        validate_limit_u32("queue", "capacity", self.capacity, QUEUE_CAPACITY_MIN, QUEUE_CAPACITY_MAX)
    }
}

/// Elastic worker pool configuration, mirroring `notifyhub-app::WorkerPoolConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct WorkerPoolConfig {
    /// Minimum number of workers kept running at all times.
    pub min_workers: u32,
    /// Maximum number of workers the autoscaler may grow to.
    pub max_workers: u32,
    /// Target fraction of workers processing, in `(0, 1]`.
    pub target_load: f64,
    /// Minimum time between successive scale-ups (ms).
    pub scale_up_delay_ms: u64,
    /// Minimum time between successive scale-downs (ms).
    pub scale_down_delay_ms: u64,
    /// How often the health monitor inspects worker activity (ms).
    pub health_check_interval_ms: u64,
    /// How long a worker may sit idle before being reported unhealthy (ms).
    pub max_idle_time_ms: u64,
    /// How many items a worker accumulates before processing as a batch.
    pub task_batch_size: u32,
    /// How long a worker waits to fill a batch before processing it (ms).
    pub batch_window_ms: u64,
    /// How many workers are started per boot batch.
    pub boot_batch_size: u32,
    /// Pause between boot batches (ms).
    pub boot_batch_pause_ms: u64,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            min_workers: 2,
            max_workers: 10,
            target_load: 0.75,
            scale_up_delay_ms: 30_000,
            scale_down_delay_ms: 60_000,
            health_check_interval_ms: 10_000,
            max_idle_time_ms: 300_000,
            task_batch_size: 1,
            batch_window_ms: 1_000,
            boot_batch_size: 2,
            boot_batch_pause_ms: 10,
        }
    }
}

impl WorkerPoolConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        validate_limit_u32("workerPool", "minWorkers", self.min_workers, WORKER_MIN_MIN, WORKER_MAX_MAX)?;
        validate_limit_u32("workerPool", "maxWorkers", self.max_workers, WORKER_MIN_MIN, WORKER_MAX_MAX)?;
        if self.max_workers < self.min_workers {
            return Err(ConfigSchemaError::LimitOutOfRange {
                section: "workerPool",
                field: "maxWorkers",
                value: u64::from(self.max_workers),
                min: u64::from(self.min_workers),
                max: u64::from(WORKER_MAX_MAX),
            });
        }
        validate_ratio("workerPool", "targetLoad", self.target_load, TARGET_LOAD_MIN, TARGET_LOAD_MAX)?;
        validate_limit_u64("workerPool", "scaleUpDelayMs", self.scale_up_delay_ms, DURATION_MS_MIN, DURATION_MS_MAX)?;
        validate_limit_u64("workerPool", "scaleDownDelayMs", self.scale_down_delay_ms, DURATION_MS_MIN, DURATION_MS_MAX)?;
        validate_limit_u64("workerPool", "healthCheckIntervalMs", self.health_check_interval_ms, DURATION_MS_MIN, DURATION_MS_MAX)?;
        validate_limit_u64("workerPool", "maxIdleTimeMs", self.max_idle_time_ms, DURATION_MS_MIN, DURATION_MS_MAX)?;
        validate_limit_u32("workerPool", "taskBatchSize", self.task_batch_size, TASK_BATCH_SIZE_MIN, TASK_BATCH_SIZE_MAX)?;
        validate_limit_u64("workerPool", "batchWindowMs", self.batch_window_ms, DURATION_MS_MIN, DURATION_MS_MAX)?;
        validate_limit_u32("workerPool", "bootBatchSize", self.boot_batch_size, TASK_BATCH_SIZE_MIN, TASK_BATCH_SIZE_MAX)?;
        validate_limit_u64("workerPool", "bootBatchPauseMs", self.boot_batch_pause_ms, DURATION_MS_MIN, DURATION_MS_MAX)?;
        Ok(())
    }
}

/// Strategy the worker pool uses to route drained batches to workers.
/// Mirrors `notifyhub-app::worker_pool::LoadBalancerStrategy`; kept as a
/// local enum so this crate never depends on `notifyhub-app`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum LoadBalancerKind {
    /// Cycle through workers in order.
    RoundRobin,
    /// Prefer the worker with the fewest items processed recently.
    LeastConnections,
    /// Prefer the worker with the highest recent throughput.
    Weighted,
    /// Prefer a worker tagged for the batch's platform.
    Affinity,
}

impl LoadBalancerKind {
    /// Canonical config string for this strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RoundRobin => "roundRobin",
            Self::LeastConnections => "leastConnections",
            Self::Weighted => "weighted",
            Self::Affinity => "affinity",
        }
    }

    /// Parse a load balancer kind from user or env input.
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "roundrobin" | "round_robin" | "round-robin" => Some(Self::RoundRobin),
            "leastconnections" | "least_connections" | "least-connections" => Some(Self::LeastConnections),
            "weighted" => Some(Self::Weighted),
            "affinity" => Some(Self::Affinity),
            _ => None,
        }
    }
}

impl fmt::Display for LoadBalancerKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Retry policy applied to callback redelivery. Mirrors
/// `notifyhub-app::callback_registry::CallbackRetryPolicy`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CallbackRetryConfig {
    /// Maximum retry attempts after the first.
    pub max_retries: u32,
    /// Delay before the first retry (ms).
    pub initial_interval_ms: u64,
    /// Backoff multiplier applied per retry.
    pub multiplier: f64,
    /// Cap on the computed delay (ms).
    pub max_interval_ms: u64,
    /// Whether to jitter the computed delay.
    pub jitter: bool,
}

impl Default for CallbackRetryConfig {
    fn default() -> Self {
        Self { max_retries: 3, initial_interval_ms: 1_000, multiplier: 2.0, max_interval_ms: 30_000, jitter: true }
    }
}

impl CallbackRetryConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        validate_limit_u32("callbackExecutor.retry", "maxRetries", self.max_retries, RETRY_MAX_RETRIES_MIN, RETRY_MAX_RETRIES_MAX)?;
        validate_limit_u64("callbackExecutor.retry", "initialIntervalMs", self.initial_interval_ms, DURATION_MS_MIN, DURATION_MS_MAX)?;
        validate_ratio("callbackExecutor.retry", "multiplier", self.multiplier, RETRY_MULTIPLIER_MIN, RETRY_MULTIPLIER_MAX)?;
        validate_limit_u64("callbackExecutor.retry", "maxIntervalMs", self.max_interval_ms, DURATION_MS_MIN, DURATION_MS_MAX)?;
        if self.max_interval_ms < self.initial_interval_ms {
            return Err(ConfigSchemaError::LimitOutOfRange {
                section: "callbackExecutor.retry",
                field: "maxIntervalMs",
                value: self.max_interval_ms,
                min: self.initial_interval_ms,
                max: DURATION_MS_MAX,
            });
        }
        Ok(())
    }
}

/// Callback registry/executor configuration. Mirrors
/// `notifyhub-app::callback_registry::CallbackRegistryConfig`, plus the
/// "fire both per-message and global callbacks" open-question default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CallbackExecutorConfig {
    /// Number of concurrent callback execution workers.
    pub executor_workers: u32,
    /// Bounded capacity of the callback execution queue.
    pub queue_capacity: u32,
    /// Capacity of the dead-letter buffer.
    pub dead_letter_capacity: u32,
    /// Default retry policy applied to every callback kind unless overridden.
    pub retry: CallbackRetryConfig,
    /// Terminal execution-record TTL before garbage collection (seconds).
    pub record_ttl_secs: u64,
    /// Whether both per-message and global callbacks fire on the same event.
    pub fire_both: bool,
}

impl Default for CallbackExecutorConfig {
    fn default() -> Self {
        Self {
            executor_workers: 10,
            queue_capacity: 100,
            dead_letter_capacity: 1_000,
            retry: CallbackRetryConfig::default(),
            record_ttl_secs: 3_600,
            fire_both: true,
        }
    }
}

impl CallbackExecutorConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        validate_limit_u32("callbackExecutor", "executorWorkers", self.executor_workers, CALLBACK_WORKERS_MIN, CALLBACK_WORKERS_MAX)?;
        validate_limit_u32("callbackExecutor", "queueCapacity", self.queue_capacity, CALLBACK_QUEUE_CAPACITY_MIN, CALLBACK_QUEUE_CAPACITY_MAX)?;
        validate_limit_u32(
            "callbackExecutor",
            "deadLetterCapacity",
            self.dead_letter_capacity,
            DEAD_LETTER_CAPACITY_MIN,
            DEAD_LETTER_CAPACITY_MAX,
        )?;
        self.retry.validate()?;
        validate_limit_u64("callbackExecutor", "recordTtlSecs", self.record_ttl_secs, 1, 604_800)?;
        Ok(())
    }
}

/// Handle registry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct HandleRegistryConfig {
    /// Maximum number of handles tracked at once.
    pub capacity: u32,
    /// How long a terminal handle is kept before garbage collection (seconds).
    pub ttl_secs: u64,
}

impl Default for HandleRegistryConfig {
    fn default() -> Self {
        Self { capacity: 10_000, ttl_secs: 300 }
    }
}

impl HandleRegistryConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        validate_limit_u32("handleRegistry", "capacity", self.capacity, HANDLE_CAPACITY_MIN, HANDLE_CAPACITY_MAX)?;
        validate_limit_u64("handleRegistry", "ttlSecs", self.ttl_secs, HANDLE_TTL_SECS_MIN, HANDLE_TTL_SECS_MAX)?;
        Ok(())
    }
}

/// Config-local mirror of `notifyhub_domain::Priority`, so the schema can be
/// exported via `schemars` without requiring `JsonSchema` on the domain enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ConfigPriority {
    /// Lowest priority tier.
    Low,
    /// Default priority tier.
    Normal,
    /// Elevated priority tier.
    High,
    /// Most urgent tier.
    Urgent,
}

impl ConfigPriority {
    /// Convert to the domain `Priority` used by the rest of the workspace.
    #[must_use]
    pub const fn to_domain(self) -> Priority {
        match self {
            Self::Low => Priority::Low,
            Self::Normal => Priority::Normal,
            Self::High => Priority::High,
            Self::Urgent => Priority::Urgent,
        }
    }
}

impl From<Priority> for ConfigPriority {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => Self::Low,
            Priority::Normal => Self::Normal,
            Priority::High => Self::High,
            Priority::Urgent => Self::Urgent,
        }
    }
}

/// Defaults applied to a per-call `AsyncOption` when the caller does not
/// override them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct AsyncOptionDefaults {
    /// Default message priority when a caller does not set one explicitly.
    pub default_priority: ConfigPriority,
    /// Default soft wait timeout (ms), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_timeout_ms: Option<u64>,
}

impl Default for AsyncOptionDefaults {
    fn default() -> Self {
        Self { default_priority: ConfigPriority::Normal, default_timeout_ms: None }
    }
}

/// Typed validation errors for the configuration schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported by this binary.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A numeric limit is out of bounds.
    LimitOutOfRange {
        /// Schema section (e.g. `workerPool`).
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Value provided.
        value: u64,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
    },
    /// A ratio/fraction field is out of `[min, max]`.
    RatioOutOfRange {
        /// Schema section.
        section: &'static str,
        /// Field name.
        field: &'static str,
        /// Value provided.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::LimitOutOfRange { .. } => ErrorCode::new("config", "invalid_limit"),
            Self::RatioOutOfRange { .. } => ErrorCode::new("config", "invalid_ratio"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => {
                write!(formatter, "unsupported config version: {found} (supported: {supported})")
            },
            Self::LimitOutOfRange { section, field, value, min, max } => {
                write!(formatter, "{section}.{field} must be within [{min}, {max}] (got {value})")
            },
            Self::RatioOutOfRange { section, field, value, min, max } => {
                write!(formatter, "{section}.{field} must be within [{min}, {max}] (got {value})")
            },
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => {
                envelope = envelope.with_metadata("found", found.to_string()).with_metadata("supported", supported.to_string());
            },
            ConfigSchemaError::LimitOutOfRange { section, field, value, min, max } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("value", value.to_string())
                    .with_metadata("min", min.to_string())
                    .with_metadata("max", max.to_string());
            },
            ConfigSchemaError::RatioOutOfRange { section, field, value, min, max } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("value", value.to_string())
                    .with_metadata("min", min.to_string())
                    .with_metadata("max", max.to_string());
            },
        }

        envelope
    }
}

fn validate_limit_u32(section: &'static str, field: &'static str, value: u32, min: u32, max: u32) -> Result<(), ConfigSchemaError> {
    if value < min || value > max {
        return Err(ConfigSchemaError::LimitOutOfRange { section, field, value: u64::from(value), min: u64::from(min), max: u64::from(max) });
    }
    Ok(())
}

fn validate_limit_u64(section: &'static str, field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigSchemaError> {
    if value < min || value > max {
        return Err(ConfigSchemaError::LimitOutOfRange { section, field, value, min, max });
    }
    Ok(())
}

fn validate_ratio(section: &'static str, field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigSchemaError> {
    if !(min..=max).contains(&value) {
        return Err(ConfigSchemaError::RatioOutOfRange { section, field, value, min, max });
    }
    Ok(())
}
