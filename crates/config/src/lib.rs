//! # notifyhub-config
//!
//! Configuration schema, validation, and normalization logic for notifyhub.
//! This crate depends on `domain` and `shared` only — never on `app` or
//! `infra`, which translate a validated config into the runtime types those
//! crates own.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (file + env + explicit overrides).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;
/// JSON Schema export for the config.
pub mod schema_export;

pub use env::{EnvMap, NotifyHubEnv};
pub use load::{ConfigFormatHint, NotifyHubConfigOverrides, load_notifyhub_config_from_path, load_notifyhub_config_from_sources, to_pretty_json, to_pretty_toml};
pub use schema::{
    AsyncOptionDefaults, CURRENT_CONFIG_VERSION, CallbackExecutorConfig, CallbackRetryConfig, ConfigPriority, ConfigSchemaError,
    HandleRegistryConfig, LoadBalancerKind, NotifyHubConfig, QueueConfig, ValidatedNotifyHubConfig, WorkerPoolConfig, parse_notifyhub_config_json,
    parse_notifyhub_config_toml,
};
pub use schema_export::notifyhub_config_schema;

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifyhub_domain::domain_crate_version;
    use notifyhub_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;
        let mut in_dev_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]";
                in_dev_deps = line == "[dev-dependencies]";
                continue;
            }
            if !(in_deps || in_dev_deps) {
                continue;
            }
            if line.starts_with("notifyhub-") {
                let key = line.split('=').next().unwrap_or("").trim();
                let name = key.split('.').next().unwrap_or("").trim();
                deps.push(name.to_string());
            }
        }

        deps
    }

    #[test]
    fn config_does_not_depend_on_app_or_infra() {
        let deps = workspace_deps();
        let forbidden = ["notifyhub-app", "notifyhub-infra"];

        for dep in &deps {
            assert!(!forbidden.contains(&dep.as_str()), "forbidden dependency found: {dep}");
        }
    }

    #[test]
    fn config_crate_compiles() {
        let version = config_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn config_can_use_domain_and_shared() {
        let domain_version = domain_crate_version();
        let shared_version = shared_crate_version();

        assert!(!domain_version.is_empty());
        assert!(!shared_version.is_empty());
    }
}
