//! Health command handler: liveness check across every registered adapter.

use super::support::{build_adapters, build_config, collect_scoped_env, parse_overrides};
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, infra_exit_code};
use notifyhub_facade::Client;
use std::path::Path;

/// Run the health command: call every registered adapter's health check and
/// report per-platform outcomes.
pub async fn run_health(mode: OutputMode, config_path: Option<&Path>, overrides_json: Option<&str>) -> Result<CliOutput, CliError> {
    let overrides = parse_overrides(overrides_json)?;
    let env = collect_scoped_env("NOTIFYHUB_");

    let config = match build_config(config_path, overrides.as_ref()) {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error, infra_exit_code(&error))),
    };
    let adapters = match build_adapters(&env) {
        Ok(adapters) => adapters,
        Err(error) => return Ok(format_error_output(mode, &error, infra_exit_code(&error))),
    };

    let client = Client::new(&config, adapters);
    let results = client.health().await;

    let mut healthy = true;
    let mut per_platform = serde_json::Map::new();
    for (platform, outcome) in &results {
        match outcome {
            Ok(()) => {
                per_platform.insert(platform.clone(), serde_json::json!({"status": "ok"}));
            },
            Err(error) => {
                healthy = false;
                let api_error = notifyhub_facade::error_envelope_to_api_v1_error(error, None);
                per_platform.insert(platform.clone(), serde_json::json!({"status": "error", "error": api_error}));
            },
        }
    }

    let stdout = if mode.is_ndjson() {
        let mut out = serde_json::to_string(&serde_json::json!({
            "type": "summary",
            "status": if healthy { "ok" } else { "degraded" },
            "kind": "health",
            "platforms": per_platform,
        }))?;
        out.push('\n');
        out
    } else if mode.is_json() {
        let mut out = serde_json::to_string_pretty(&serde_json::json!({
            "status": if healthy { "ok" } else { "degraded" },
            "platforms": per_platform,
        }))?;
        out.push('\n');
        out
    } else {
        let mut out = format!("status: {}\n", if healthy { "ok" } else { "degraded" });
        let mut names: Vec<&String> = results.keys().collect();
        names.sort();
        for name in names {
            let status = if results[name].is_ok() { "ok" } else { "error" };
            out.push_str(&format!("{name}: {status}\n"));
        }
        out
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}
