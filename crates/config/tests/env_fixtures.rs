//! Integration tests for env parsing and env-to-config merging.

use notifyhub_config::{NotifyHubConfig, NotifyHubEnv, env};
use notifyhub_shared::ErrorCode;
use std::collections::BTreeMap;
use std::error::Error;

fn env_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect()
}

#[test]
fn env_fixtures_merge_into_effective_config() -> Result<(), Box<dyn Error>> {
    let map = env_map(&[
        (env::ENV_QUEUE_CAPACITY, "4096"),
        (env::ENV_WORKER_POOL_MIN_WORKERS, "4"),
        (env::ENV_WORKER_POOL_MAX_WORKERS, "16"),
        (env::ENV_CALLBACK_RETRY_MAX_RETRIES, "5"),
        (env::ENV_ASYNC_DEFAULT_PRIORITY, "high"),
        (env::ENV_LOAD_BALANCER, "round-robin"),
    ]);
    let parsed = NotifyHubEnv::from_map(&map)?;
    let config = parsed.apply(NotifyHubConfig::default());

    assert_eq!(config.queue.capacity, 4096);
    assert_eq!(config.worker_pool.min_workers, 4);
    assert_eq!(config.worker_pool.max_workers, 16);
    assert_eq!(config.callback_executor.retry.max_retries, 5);
    assert_eq!(config.async_options.default_priority, notifyhub_config::ConfigPriority::High);
    assert_eq!(config.load_balancer, notifyhub_config::LoadBalancerKind::RoundRobin);

    Ok(())
}

#[test]
fn invalid_env_fixture_is_rejected() -> Result<(), Box<dyn Error>> {
    let map = env_map(&[(env::ENV_WORKER_POOL_TARGET_LOAD, "not-a-ratio")]);
    let error = NotifyHubEnv::from_map(&map).err();
    assert!(error.is_some());

    let envelope = error.ok_or_else(|| std::io::Error::other("expected invalid env error"))?;
    assert_eq!(envelope.code, ErrorCode::new("config", "invalid_env_value"));
    assert_eq!(envelope.metadata.get("variable").map(String::as_str), Some(env::ENV_WORKER_POOL_TARGET_LOAD));

    Ok(())
}
