//! # notifyhub-domain
//!
//! Domain entities, primitives, and value objects for notifyhub.
//!
//! This crate contains the core domain model with no infrastructure dependencies:
//!
//! - **Ids** - `MessageId`, `BatchId`
//! - **Message / Target** - immutable value types with validating builders
//! - **Receipt / SendResult** - delivery outcomes
//! - **Handle state** - `HandleState`, `BatchSummary`
//! - **Callback events** - `CallbackEvent`
//!
//! ## Dependency Rules
//!
//! - Depends only on the `shared` and `validate-derive` crates
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

// Re-export shared types for convenience
pub use notifyhub_shared::shared_crate_version;

pub mod callback;
pub mod error;
pub mod format;
pub mod handle_state;
pub mod ids;
pub mod message;
pub mod priority;
pub mod receipt;
pub mod target;

pub use callback::CallbackEvent;
pub use error::DomainError;
pub use format::MessageFormat;
pub use handle_state::{BatchSummary, HandleState};
pub use ids::{BatchId, MessageId};
pub use message::{
    MAX_BODY_CHARS, MAX_SCHEDULE_HORIZON, MAX_TARGETS, MAX_TITLE_CHARS, MIN_TARGETS, Message,
    MessageBuilder,
};
pub use priority::Priority;
pub use receipt::{Receipt, ReceiptStatus, SendResult};
pub use target::{Target, TargetBuilder};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
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

    /// Domain depends only on shared + the validate derive macro.
    #[test]
    fn domain_depends_only_on_shared_and_validate_derive() {
        let deps = workspace_deps();
        let allowed = ["notifyhub-shared", "notifyhub-validate-derive"];

        for dep in &deps {
            assert!(
                allowed.contains(&dep.as_str()),
                "unexpected dependency found: {dep}"
            );
        }
    }

    #[test]
    fn domain_crate_compiles() {
        let version = domain_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn domain_depends_on_shared() {
        let shared_version = shared_crate_version();
        assert!(!shared_version.is_empty());
    }
}
