//! # notifyhub-api
//!
//! Stable wire DTOs for operator tooling: the CLI today, any future HTTP
//! adapter tomorrow. Deliberately separate from `notifyhub-domain` and
//! `notifyhub-app` so the runtime types can evolve without breaking the wire
//! contract — this crate depends on both only to map their public result
//! types (`Receipt`, `HandleSnapshot`, `ExecutorStats`, ...) onto a stable,
//! independently-versioned DTO surface. It has no knowledge of the queue,
//! dispatcher, or adapters themselves; `notifyhub-infra` wires those up.

/// API v1 DTOs.
pub mod v1;

/// Returns the API crate version.
#[must_use]
pub const fn api_crate_version() -> &'static str {
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

    /// The wire-DTO layer maps domain/app result types; it never reaches
    /// into the queue, dispatcher, or adapters directly.
    #[test]
    fn api_depends_only_on_domain_shared_app_and_validate_derive() {
        let deps = workspace_deps();
        let allowed = [
            "notifyhub-domain",
            "notifyhub-shared",
            "notifyhub-app",
            "notifyhub-validate-derive",
        ];

        for dep in &deps {
            assert!(
                allowed.contains(&dep.as_str()),
                "unexpected dependency found: {dep}"
            );
        }
    }

    #[test]
    fn api_crate_compiles() {
        let version = api_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn api_can_use_domain_and_shared() {
        let domain_version = domain_crate_version();
        let shared_version = shared_crate_version();

        assert!(!domain_version.is_empty());
        assert!(!shared_version.is_empty());
    }
}
