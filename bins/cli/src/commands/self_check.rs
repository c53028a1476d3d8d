//! Self-check command handler: debug-only smoke test of env parsing and the
//! executor lifecycle, with no network calls.

use super::support::collect_scoped_env;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, infra_exit_code};
use notifyhub_config::{NotifyHubConfig, ValidatedNotifyHubConfig};
use notifyhub_facade::Client;
use std::time::Duration;

/// Run the self-check command: validate the scoped environment, then spin up
/// and tear down a minimal executor to confirm the worker pool, delay
/// scheduler, and dispatcher wiring all start and stop cleanly.
pub async fn run_self_check(mode: OutputMode) -> Result<CliOutput, CliError> {
    let env = collect_scoped_env("NOTIFYHUB_");

    if let Err(error) = notifyhub_facade::validate_env_parsing(&env) {
        return Ok(format_error_output(mode, &error, infra_exit_code(&error)));
    }

    let mut raw = NotifyHubConfig::default();
    raw.worker_pool.min_workers = 1;
    raw.worker_pool.max_workers = 1;
    let config: ValidatedNotifyHubConfig = match raw.validate_and_normalize() {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error.into(), ExitCode::Internal)),
    };

    let client = Client::new(&config, Vec::new());
    client.start().await;
    let lifecycle_ok = client.stop(Duration::from_millis(500)).await.is_ok();

    let build = notifyhub_core::build_info();
    let facade_version = notifyhub_facade::facade_crate_version();

    let stdout = if mode.is_json() {
        let mut out = serde_json::to_string_pretty(&serde_json::json!({
            "status": "ok",
            "env": {"status": "ok"},
            "executor": {"status": if lifecycle_ok { "ok" } else { "error" }},
            "build": {
                "name": build.name,
                "version": build.version,
                "facadeVersion": facade_version,
                "rustcVersion": build.rustc_version,
                "target": build.target,
                "profile": build.profile,
                "gitHash": build.git_hash,
                "gitDirty": build.git_dirty,
            }
        }))?;
        out.push('\n');
        out
    } else {
        format!(
            "status: ok\nenv: ok\nexecutor: {}\nname: {}\nversion: {}\nfacade: {}\nrustc: {}\ntarget: {}\nprofile: {}\ngit: {}{}\n",
            if lifecycle_ok { "ok" } else { "error" },
            build.name,
            build.version,
            facade_version,
            build.rustc_version,
            build.target,
            build.profile,
            build.git_hash.unwrap_or("none"),
            if build.git_dirty { " (dirty)" } else { "" }
        )
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}
