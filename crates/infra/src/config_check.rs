//! Config loading helpers for CLI surfaces.

use crate::InfraResult;
use notifyhub_config::{load_notifyhub_config_from_path, load_notifyhub_config_from_sources, to_pretty_json, NotifyHubConfigOverrides, NotifyHubEnv};
use std::collections::BTreeMap;
use std::path::Path;

/// Load and validate the effective config from a file path (env and
/// overrides layered on top per `notifyhub-config`'s precedence), returning
/// deterministic pretty-printed JSON.
///
/// # Errors
/// Returns an [`crate::InfraError`] if the file cannot be read or parsed, the
/// process environment fails to parse, an override is invalid, or the
/// resulting config fails schema validation.
pub fn load_effective_config_from_path_json(path: &Path, overrides: Option<&NotifyHubConfigOverrides>) -> InfraResult<String> {
    let config = load_notifyhub_config_from_path(path, overrides)?;
    to_pretty_json(config.as_ref())
}

/// Load and validate the effective config from an explicit env map (no
/// config file), returning deterministic pretty-printed JSON. Used by CLI
/// surfaces that accept `--set key=value` style overrides without a config
/// file on disk.
///
/// # Errors
/// Returns an [`crate::InfraError`] if an environment variable fails to
/// parse, an override is invalid, or the resulting config fails schema
/// validation.
pub fn load_effective_config_from_env_json(env: &BTreeMap<String, String>, overrides: Option<&NotifyHubConfigOverrides>) -> InfraResult<String> {
    let env = NotifyHubEnv::from_map(env)?;
    let config = load_notifyhub_config_from_sources(None, None, &env, overrides)?;
    to_pretty_json(config.as_ref())
}
