//! Environment validation helpers for CLI surfaces.

use notifyhub_config::{NotifyHubConfig, NotifyHubEnv};
use notifyhub_shared::ErrorEnvelope;
use std::collections::BTreeMap;

/// Infra-level error type (shared error envelope).
pub type InfraError = ErrorEnvelope;

/// Infra-level result type.
pub type InfraResult<T> = Result<T, InfraError>;

/// Validate that the provided env overrides can be parsed and merged into a
/// config that itself passes schema validation.
///
/// # Errors
/// Returns an [`ErrorEnvelope`] if any recognized variable fails to parse,
/// or if the merged config fails schema validation.
pub fn validate_env_parsing(env: &BTreeMap<String, String>) -> InfraResult<()> {
    let parsed = NotifyHubEnv::from_map(env)?;
    let merged = parsed.apply(NotifyHubConfig::default());
    merged.validate_and_normalize()?;
    Ok(())
}
