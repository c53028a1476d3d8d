//! Schedule-batch command handler: enqueue several messages as one unit.

use super::support::{build_adapters, build_config, collect_scoped_env, parse_overrides};
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, infra_exit_code};
use notifyhub_facade::Client;
use std::path::Path;
use std::time::Duration;

/// Run the schedule-batch command: `input_json` is a JSON array of
/// send-message requests, validated and submitted together. With `wait_ms`
/// set, blocks until every child reaches a terminal state or the window
/// elapses; otherwise returns immediately with the batch id.
pub async fn run_schedule_batch(
    mode: OutputMode,
    input_json: &str,
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    wait_ms: Option<u64>,
) -> Result<CliOutput, CliError> {
    let overrides = parse_overrides(overrides_json)?;
    let env = collect_scoped_env("NOTIFYHUB_");

    let requests: Vec<serde_json::Value> = match serde_json::from_str(input_json) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(_) => return Err(CliError::InvalidInput("schedule-batch input must be a JSON array".to_string())),
        Err(error) => return Err(CliError::InvalidInput(format!("invalid batch JSON: {error}"))),
    };

    let mut messages = Vec::with_capacity(requests.len());
    for request in requests {
        let request_json = serde_json::to_string(&request)?;
        match notifyhub_facade::validate_send_message_request_json(&request_json) {
            Ok(message) => messages.push(message),
            Err(error) => return Ok(format_error_output(mode, &error, infra_exit_code(&error))),
        }
    }

    let config = match build_config(config_path, overrides.as_ref()) {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error, infra_exit_code(&error))),
    };
    let adapters = match build_adapters(&env) {
        Ok(adapters) => adapters,
        Err(error) => return Ok(format_error_output(mode, &error, infra_exit_code(&error))),
    };

    let client = Client::new(&config, adapters);
    client.start().await;

    let batch = match client.schedule_batch(messages, notifyhub_app::AsyncOption::default()).await {
        Ok(batch) => batch,
        Err(error) => {
            let _ = client.stop(Duration::from_millis(500)).await;
            return Ok(format_error_output(mode, &error, infra_exit_code(&error)));
        },
    };
    let batch_id = batch.batch_id().to_string();

    let stdout = if let Some(wait_ms) = wait_ms {
        let cancel = notifyhub_shared::CancellationToken::new();
        let cancel_for_sleep = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            cancel_for_sleep.cancel();
        });
        let summary = batch.wait(Some(&cancel)).await;
        render_batch(mode, &batch_id, summary.total, summary.completed, summary.failed, summary.is_done())?
    } else {
        let (completed, failed, total) = batch.counters();
        render_batch(mode, &batch_id, total, completed, failed, batch.is_done())?
    };

    client.stop(Duration::from_millis(2000)).await.map_err(|_error| CliError::InvalidInput("worker pool drain timed out".to_string()))?;

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

#[allow(clippy::too_many_arguments, reason = "plain tabular batch summary, splitting it adds indirection without clarity")]
fn render_batch(mode: OutputMode, batch_id: &str, total: usize, completed: usize, failed: usize, done: bool) -> Result<String, CliError> {
    Ok(if mode.is_ndjson() {
        let mut out = serde_json::to_string(&serde_json::json!({
            "type": "summary",
            "status": "ok",
            "kind": "schedule-batch",
            "batchId": batch_id,
            "total": total,
            "completed": completed,
            "failed": failed,
            "done": done,
        }))?;
        out.push('\n');
        out
    } else if mode.is_json() {
        let mut out = serde_json::to_string_pretty(&serde_json::json!({
            "status": "ok",
            "batchId": batch_id,
            "total": total,
            "completed": completed,
            "failed": failed,
            "done": done,
        }))?;
        out.push('\n');
        out
    } else {
        format!("status: ok\nbatchId: {batch_id}\ntotal: {total}\ncompleted: {completed}\nfailed: {failed}\ndone: {done}\n")
    })
}
