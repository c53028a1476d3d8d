//! Shared plumbing for commands that talk to a live [`notifyhub_facade::Client`].

use crate::error::CliError;
use notifyhub_config::{NotifyHubConfigOverrides, NotifyHubEnv, ValidatedNotifyHubConfig};
use notifyhub_facade::InfraError;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Resolve an input payload from an explicit `--input-json` flag or stdin.
pub fn resolve_input(input_json: Option<&str>, from_stdin: bool) -> Result<String, CliError> {
    if from_stdin {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim();
        if trimmed.is_empty() {
            return Err(CliError::InvalidInput("stdin input is empty".to_string()));
        }
        return Ok(trimmed.to_string());
    }
    input_json
        .map(str::to_owned)
        .ok_or_else(|| CliError::InvalidInput("missing --input-json or --stdin".to_string()))
}

/// Parse a `NotifyHubConfigOverrides` JSON blob, if supplied.
pub fn parse_overrides(overrides_json: Option<&str>) -> Result<Option<NotifyHubConfigOverrides>, CliError> {
    let Some(raw) = overrides_json else {
        return Ok(None);
    };
    let overrides: NotifyHubConfigOverrides = serde_json::from_str(raw)
        .map_err(|error| CliError::InvalidInput(format!("invalid overrides JSON: {error}")))?;
    Ok(Some(overrides))
}

/// Load the effective, validated config from a file path (layered with the
/// process environment) or, absent a path, from the process environment alone.
///
/// # Errors
/// Propagates an [`InfraError`] if the file cannot be read/parsed, an
/// environment variable fails to parse, an override is invalid, or the
/// merged config fails schema validation.
pub fn build_config(path: Option<&Path>, overrides: Option<&NotifyHubConfigOverrides>) -> Result<ValidatedNotifyHubConfig, InfraError> {
    match path {
        Some(path) => notifyhub_config::load_notifyhub_config_from_path(path, overrides),
        None => {
            let env = NotifyHubEnv::from_std_env()?;
            notifyhub_config::load_notifyhub_config_from_sources(None, None, &env, overrides)
        },
    }
}

/// Build every platform adapter this process has credentials for, from
/// `NOTIFYHUB_*` environment variables scoped by [`collect_scoped_env`].
///
/// # Errors
/// Propagates an [`InfraError`] if a configured adapter (one whose
/// credentials are present) fails to construct.
pub fn build_adapters(env: &BTreeMap<String, String>) -> Result<Vec<Arc<dyn notifyhub_ports::PlatformAdapter>>, InfraError> {
    notifyhub_facade::build_configured_adapters(env)
}

/// Collect every environment variable whose name starts with `prefix`.
pub fn collect_scoped_env(prefix: &str) -> BTreeMap<String, String> {
    std::env::vars().filter(|(key, _)| key.starts_with(prefix)).collect()
}
