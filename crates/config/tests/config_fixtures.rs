//! Integration tests for parsing NotifyHub config fixtures.

use notifyhub_config::{CURRENT_CONFIG_VERSION, LoadBalancerKind, parse_notifyhub_config_json, parse_notifyhub_config_toml};
use notifyhub_shared::ErrorCode;
use std::error::Error;

const VALID_JSON: &str = r#"{
    "version": 1,
    "queue": { "capacity": 5000, "delayedEnabled": true },
    "workerPool": {
        "minWorkers": 4,
        "maxWorkers": 20,
        "targetLoad": 0.8,
        "scaleUpDelayMs": 30000,
        "scaleDownDelayMs": 60000,
        "healthCheckIntervalMs": 10000,
        "maxIdleTimeMs": 300000,
        "taskBatchSize": 2,
        "batchWindowMs": 1000,
        "bootBatchSize": 2,
        "bootBatchPauseMs": 10
    },
    "callbackExecutor": {
        "executorWorkers": 8,
        "queueCapacity": 200,
        "deadLetterCapacity": 500,
        "retry": {
            "maxRetries": 5,
            "initialIntervalMs": 500,
            "multiplier": 2.0,
            "maxIntervalMs": 10000,
            "jitter": false
        },
        "recordTtlSecs": 1800,
        "fireBoth": true
    },
    "handleRegistry": { "capacity": 50000, "ttlSecs": 600 },
    "asyncOptions": { "defaultPriority": "high", "defaultTimeoutMs": 2000 },
    "loadBalancer": "weighted"
}"#;

const INVALID_JSON: &str = r#"{
    "version": 1,
    "queue": { "capacity": 5000, "delayedEnabled": true },
    "workerPool": {
        "minWorkers": 20,
        "maxWorkers": 4,
        "targetLoad": 0.8,
        "scaleUpDelayMs": 30000,
        "scaleDownDelayMs": 60000,
        "healthCheckIntervalMs": 10000,
        "maxIdleTimeMs": 300000,
        "taskBatchSize": 2,
        "batchWindowMs": 1000,
        "bootBatchSize": 2,
        "bootBatchPauseMs": 10
    },
    "callbackExecutor": {
        "executorWorkers": 8,
        "queueCapacity": 200,
        "deadLetterCapacity": 500,
        "retry": { "maxRetries": 5, "initialIntervalMs": 500, "multiplier": 2.0, "maxIntervalMs": 10000, "jitter": false },
        "recordTtlSecs": 1800,
        "fireBoth": true
    },
    "handleRegistry": { "capacity": 50000, "ttlSecs": 600 },
    "asyncOptions": { "defaultPriority": "high", "defaultTimeoutMs": 2000 },
    "loadBalancer": "weighted"
}"#;

const DEFAULT_TOML: &str = r#"
version = 1

[queue]
capacity = 1000
delayedEnabled = true

[workerPool]
minWorkers = 2
maxWorkers = 10
targetLoad = 0.75
scaleUpDelayMs = 30000
scaleDownDelayMs = 60000
healthCheckIntervalMs = 10000
maxIdleTimeMs = 300000
taskBatchSize = 1
batchWindowMs = 1000
bootBatchSize = 2
bootBatchPauseMs = 10

[callbackExecutor]
executorWorkers = 10
queueCapacity = 100
deadLetterCapacity = 1000
recordTtlSecs = 3600
fireBoth = true

[callbackExecutor.retry]
maxRetries = 3
initialIntervalMs = 1000
multiplier = 2.0
maxIntervalMs = 30000
jitter = true

[handleRegistry]
capacity = 10000
ttlSecs = 300

[asyncOptions]
defaultPriority = "normal"

loadBalancer = "leastConnections"
"#;

#[test]
fn parses_valid_fixture_and_normalizes() -> Result<(), Box<dyn Error>> {
    let config = parse_notifyhub_config_json(VALID_JSON)?;

    assert_eq!(config.as_ref().version, CURRENT_CONFIG_VERSION);
    assert_eq!(config.as_ref().queue.capacity, 5000);
    assert_eq!(config.as_ref().worker_pool.max_workers, 20);
    assert_eq!(config.as_ref().callback_executor.retry.max_retries, 5);
    assert_eq!(config.as_ref().load_balancer, LoadBalancerKind::Weighted);

    Ok(())
}

#[test]
fn parses_default_toml_fixture() -> Result<(), Box<dyn Error>> {
    let config = parse_notifyhub_config_toml(DEFAULT_TOML)?;

    assert_eq!(config.as_ref().worker_pool.min_workers, 2);
    assert_eq!(config.as_ref().handle_registry.ttl_secs, 300);
    assert_eq!(config.as_ref().load_balancer, LoadBalancerKind::LeastConnections);

    Ok(())
}

#[test]
fn invalid_fixture_reports_error_code() -> Result<(), Box<dyn Error>> {
    let result = parse_notifyhub_config_json(INVALID_JSON);
    assert!(result.is_err());

    let error = result.err().ok_or_else(|| std::io::Error::other("expected invalid fixture error"))?;

    assert_eq!(error.code, ErrorCode::new("config", "invalid_limit"));
    assert_eq!(error.metadata.get("section").map(String::as_str), Some("workerPool"));
    assert_eq!(error.metadata.get("field").map(String::as_str), Some("maxWorkers"));

    Ok(())
}
