//! # notifyhub-infra
//!
//! Composition root: wires `notifyhub-config`, `notifyhub-adapters`, and
//! `notifyhub-app` together into a single runnable executor, plus the
//! env/config/request validation helpers the CLI and facade crates build on.
//!
//! This crate depends on `app`, `adapters`, `config`, `domain`, `ports`, and
//! `shared`. Nothing downstream of here (`facade`, `bins/cli`) should need to
//! touch `notifyhub-app`'s or `notifyhub-config`'s types directly — both are
//! bridged here.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

/// Config loading helpers used by CLI surfaces.
pub mod config_check;
/// Config/app type conversion and executor/dispatcher wiring.
pub mod composition;
/// Environment validation helpers used by CLI surfaces.
pub mod env_check;
/// Platform adapter selection and construction from environment credentials.
pub mod platform_factory;
/// Request validation helpers used by CLI/facade surfaces.
pub mod request_check;

pub use composition::{build_dispatcher, build_executor, executor_config_from};
pub use config_check::{load_effective_config_from_env_json, load_effective_config_from_path_json};
pub use env_check::{validate_env_parsing, InfraError, InfraResult};
pub use platform_factory::{
    build_chat_webhook_adapters, build_configured_adapters, build_sms_adapter, build_smtp_adapter, build_webhook_adapter,
};
pub use request_check::{validate_send_message_request_json, SendMessageRequest, TargetRequest};

// Re-export redaction utilities for CLI boundary sanitization.
pub use notifyhub_shared::{is_secret_key, redact_if_secret};

/// Returns the infra crate version.
#[must_use]
pub const fn infra_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifyhub_adapters::adapters_crate_version;
    use notifyhub_app::app_crate_version;
    use notifyhub_config::config_crate_version;
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
    fn infra_depends_on_app_adapters_config() {
        let deps = workspace_deps();
        let required = ["notifyhub-app", "notifyhub-adapters", "notifyhub-config"];

        for expected in required {
            assert!(deps.iter().any(|dep| dep == expected), "missing dependency: {expected}");
        }
    }

    #[test]
    fn infra_crate_compiles() {
        let version = infra_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn infra_can_use_app_adapters_config_shared() {
        assert!(!app_crate_version().is_empty());
        assert!(!adapters_crate_version().is_empty());
        assert!(!config_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
