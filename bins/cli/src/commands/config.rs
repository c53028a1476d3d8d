//! Config command handlers.

use super::support::parse_overrides;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, infra_exit_code};
use std::collections::BTreeMap;
use std::path::Path;

/// Run `config show`: print the effective config (file + env + overrides)
/// as pretty JSON.
pub fn run_config_show(
    mode: OutputMode,
    path: Option<&Path>,
    overrides_json: Option<&str>,
    env: &BTreeMap<String, String>,
) -> Result<CliOutput, CliError> {
    let overrides = parse_overrides(overrides_json)?;

    let config_json = match path {
        Some(path) => notifyhub_facade::load_effective_config_from_path_json(path, overrides.as_ref()),
        None => notifyhub_facade::load_effective_config_from_env_json(env, overrides.as_ref()),
    };
    let config_json = match config_json {
        Ok(json) => json,
        Err(error) => return Ok(format_error_output(mode, &error, infra_exit_code(&error))),
    };

    let stdout = if mode.is_ndjson() {
        let value: serde_json::Value = serde_json::from_str(&config_json)?;
        let mut out = serde_json::to_string(&serde_json::json!({
            "type": "summary",
            "status": "ok",
            "kind": "config",
            "config": value,
        }))?;
        out.push('\n');
        out
    } else if mode.is_json() {
        let value: serde_json::Value = serde_json::from_str(&config_json)?;
        let mut out = serde_json::to_string_pretty(&serde_json::json!({
            "status": "ok",
            "config": value,
        }))?;
        out.push('\n');
        out
    } else {
        let mut out = String::from("status: ok\nconfig:\n");
        out.push_str(&config_json);
        out.push('\n');
        out
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

/// Run `config schema`: print the config's JSON Schema.
pub fn run_config_schema(mode: OutputMode) -> Result<CliOutput, CliError> {
    let schema = notifyhub_config::notifyhub_config_schema();

    let stdout = if mode.is_ndjson() {
        let mut out = serde_json::to_string(&serde_json::json!({
            "type": "summary",
            "status": "ok",
            "kind": "config-schema",
            "schema": schema,
        }))?;
        out.push('\n');
        out
    } else {
        let mut out = serde_json::to_string_pretty(&schema)?;
        out.push('\n');
        out
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}
