//! Config loading helpers (file + env + explicit overrides).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.
//!
//! Precedence (highest wins): explicit override > environment > file > defaults.
//! This differs from a file-less env-wins chain: an explicit override is
//! something the caller passed directly to a builder, so it must be able to
//! pin a value even when an operator's environment also sets it.

use crate::env::NotifyHubEnv;
use crate::schema::{NotifyHubConfig, ValidatedNotifyHubConfig};
use notifyhub_shared::{ErrorCode, ErrorEnvelope};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        other => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            format!("unsupported config file extension: {:?} (expected .json or .toml)", other.unwrap_or("<none>")),
        )
        .with_metadata("path", path.display().to_string())),
    }
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "file_not_found"),
            std::io::ErrorKind::PermissionDenied => ErrorCode::new("config", "file_permission_denied"),
            _ => ErrorCode::new("config", "file_read_failed"),
        };
        ErrorEnvelope::expected(code, format!("failed to read config file {}: {error}", path.display()))
            .with_metadata("path", path.display().to_string())
    })
}

fn parse_config_unvalidated(input: &str, format: ConfigFormat) -> Result<NotifyHubConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input)
            .map_err(|error| ErrorEnvelope::expected(ErrorCode::new("config", "invalid_json"), format!("invalid config JSON: {error}"))),
        ConfigFormat::Toml => {
            toml::from_str(input).map_err(|error| ErrorEnvelope::expected(ErrorCode::new("config", "invalid_toml"), format!("invalid config TOML: {error}")))
        },
    }
}

/// Partial config supplied explicitly by a caller (e.g. functional-option
/// overrides passed to a builder). Every field is optional and only present
/// fields are applied; absent fields fall through to whatever the
/// file/env/default layers already produced.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct NotifyHubConfigOverrides {
    /// Override for `queue.capacity`.
    pub queue_capacity: Option<u32>,
    /// Override for `workerPool.minWorkers`.
    pub worker_pool_min_workers: Option<u32>,
    /// Override for `workerPool.maxWorkers`.
    pub worker_pool_max_workers: Option<u32>,
    /// Override for `workerPool.targetLoad`.
    pub worker_pool_target_load: Option<f64>,
    /// Override for `callbackExecutor.executorWorkers`.
    pub callback_executor_workers: Option<u32>,
    /// Override for `callbackExecutor.queueCapacity`.
    pub callback_queue_capacity: Option<u32>,
    /// Override for `handleRegistry.capacity`.
    pub handle_registry_capacity: Option<u32>,
    /// Override for `loadBalancer`.
    pub load_balancer: Option<String>,
}

impl NotifyHubConfigOverrides {
    fn apply(&self, mut config: NotifyHubConfig) -> Result<NotifyHubConfig, ErrorEnvelope> {
        if let Some(value) = self.queue_capacity {
            config.queue.capacity = value;
        }
        if let Some(value) = self.worker_pool_min_workers {
            config.worker_pool.min_workers = value;
        }
        if let Some(value) = self.worker_pool_max_workers {
            config.worker_pool.max_workers = value;
        }
        if let Some(value) = self.worker_pool_target_load {
            config.worker_pool.target_load = value;
        }
        if let Some(value) = self.callback_executor_workers {
            config.callback_executor.executor_workers = value;
        }
        if let Some(value) = self.callback_queue_capacity {
            config.callback_executor.queue_capacity = value;
        }
        if let Some(value) = self.handle_registry_capacity {
            config.handle_registry.capacity = value;
        }
        if let Some(ref raw) = self.load_balancer {
            config.load_balancer = crate::schema::LoadBalancerKind::parse(raw).ok_or_else(|| {
                ErrorEnvelope::expected(ErrorCode::new("config", "invalid_override_value"), format!("invalid loadBalancer override: '{raw}'"))
            })?;
        }
        Ok(config)
    }
}

/// Load the NotifyHub config from sources using a deterministic precedence
/// order: explicit override > environment > file content > defaults.
///
/// # Errors
/// Returns an [`ErrorEnvelope`] if the file content is malformed, an
/// environment variable fails to parse, an override is invalid, or the
/// resulting config fails schema validation.
pub fn load_notifyhub_config_from_sources(
    config_file: Option<&str>,
    file_format: Option<ConfigFormatHint>,
    env: &NotifyHubEnv,
    overrides: Option<&NotifyHubConfigOverrides>,
) -> Result<ValidatedNotifyHubConfig, ErrorEnvelope> {
    let mut config = match config_file {
        None => NotifyHubConfig::default(),
        Some(input) => {
            let format = match file_format {
                Some(ConfigFormatHint::Json) => ConfigFormat::Json,
                Some(ConfigFormatHint::Toml) => ConfigFormat::Toml,
                None => ConfigFormat::Json,
            };
            parse_config_unvalidated(input, format)?
        },
    };

    config = env.apply(config);

    if let Some(overrides) = overrides {
        config = overrides.apply(config)?;
    }

    config.validate_and_normalize().map_err(Into::into)
}

/// Hint for which format a config string is in, when loading from an
/// in-memory string rather than a file path (whose extension disambiguates
/// this automatically).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormatHint {
    /// JSON-encoded config.
    Json,
    /// TOML-encoded config.
    Toml,
}

/// Load the NotifyHub config from a file path, the real process environment,
/// and an optional explicit override set.
///
/// # Errors
/// Returns an [`ErrorEnvelope`] if the file cannot be read or parsed, an
/// environment variable fails to parse, an override is invalid, or the
/// resulting config fails schema validation.
pub fn load_notifyhub_config_from_path(path: &Path, overrides: Option<&NotifyHubConfigOverrides>) -> Result<ValidatedNotifyHubConfig, ErrorEnvelope> {
    let format = detect_config_format(path)?;
    let content = read_config_file(path)?;
    let env = NotifyHubEnv::from_std_env()?;
    let hint = match format {
        ConfigFormat::Json => ConfigFormatHint::Json,
        ConfigFormat::Toml => ConfigFormatHint::Toml,
    };
    load_notifyhub_config_from_sources(Some(&content), Some(hint), &env, overrides)
}

/// Serialize a config to pretty-printed JSON.
///
/// # Errors
/// Returns an [`ErrorEnvelope`] if serialization fails.
pub fn to_pretty_json(config: &NotifyHubConfig) -> Result<String, ErrorEnvelope> {
    serde_json::to_string_pretty(config)
        .map_err(|error| ErrorEnvelope::expected(ErrorCode::new("config", "serialize_failed"), format!("failed to serialize config to JSON: {error}")))
}

/// Serialize a config to pretty-printed TOML.
///
/// # Errors
/// Returns an [`ErrorEnvelope`] if serialization fails.
pub fn to_pretty_toml(config: &NotifyHubConfig) -> Result<String, ErrorEnvelope> {
    toml::to_string_pretty(config)
        .map_err(|error| ErrorEnvelope::expected(ErrorCode::new("config", "serialize_failed"), format!("failed to serialize config to TOML: {error}")))
}
