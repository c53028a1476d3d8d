//! # notifyhub-queue
//!
//! Priority queue and delay scheduler kernel for notifyhub.
//!
//! Both structures are generic over the carried item type — `notifyhub-app`
//! supplies the concrete `QueueItem`/`DelayedItem` wrappers around a
//! `Message` and its `Handle`, keeping this crate free of any dependency on
//! the executor or handle machinery it serves.
//!
//! ## Dependency Rules
//!
//! - Depends only on `domain` and `shared`
//! - No executor, handle, or adapter dependencies

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod delay;
pub mod error;
pub mod priority;
pub mod stats;

pub use delay::{DEFAULT_PROMOTION_TIMEOUT, DEFAULT_TICK_INTERVAL, DelayScheduler, Scheduled};
pub use error::QueueError;
pub use priority::{DEFAULT_CAPACITY, Prioritized, PriorityQueue};
pub use stats::{QueueHealth, QueueStatistics};

/// Returns the queue crate version.
#[must_use]
pub const fn queue_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn queue_depends_only_on_domain_and_shared() {
        let deps = workspace_deps();
        let allowed = ["notifyhub-domain", "notifyhub-shared"];
        for dep in &deps {
            assert!(allowed.contains(&dep.as_str()), "unexpected dependency found: {dep}");
        }
    }

    #[test]
    fn queue_crate_compiles() {
        let version = queue_crate_version();
        assert!(!version.is_empty());
    }
}
