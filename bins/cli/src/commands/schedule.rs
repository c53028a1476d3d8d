//! Schedule command handler: asynchronous dispatch through the queue.

use super::support::{build_adapters, build_config, collect_scoped_env, parse_overrides};
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, infra_exit_code};
use notifyhub_facade::Client;
use notifyhub_shared::CancellationToken;
use std::path::Path;
use std::time::Duration;

/// Run the schedule command: validate `input_json`, enqueue it for
/// asynchronous delivery, and either return immediately with the pending
/// handle's message id or, when `wait_ms` is set, block until the handle
/// reaches a terminal state or the wait window elapses.
pub async fn run_schedule(
    mode: OutputMode,
    input_json: &str,
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    wait_ms: Option<u64>,
) -> Result<CliOutput, CliError> {
    let overrides = parse_overrides(overrides_json)?;
    let env = collect_scoped_env("NOTIFYHUB_");

    let message = match notifyhub_facade::validate_send_message_request_json(input_json) {
        Ok(message) => message,
        Err(error) => return Ok(format_error_output(mode, &error, infra_exit_code(&error))),
    };

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

    let handle = match client.schedule(message, notifyhub_app::AsyncOption::default()).await {
        Ok(handle) => handle,
        Err(error) => {
            let _ = client.stop(Duration::from_millis(500)).await;
            return Ok(format_error_output(mode, &error, infra_exit_code(&error)));
        },
    };
    let message_id = handle.message_id().as_str().to_string();

    let stdout = if let Some(wait_ms) = wait_ms {
        let deadline = CancellationToken::new();
        let deadline_for_sleep = deadline.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            deadline_for_sleep.cancel();
        });

        match handle.wait(Some(&deadline)).await {
            Ok(receipt) => {
                let dto = notifyhub_facade::receipt_to_api_v1(&receipt);
                render_terminal(mode, &message_id, &dto)?
            },
            Err(error) => {
                let _ = client.stop(Duration::from_millis(500)).await;
                return Ok(format_error_output(mode, &error, infra_exit_code(&error)));
            },
        }
    } else {
        render_pending(mode, &message_id)?
    };

    client.stop(Duration::from_millis(2000)).await.map_err(|_error| CliError::InvalidInput("worker pool drain timed out".to_string()))?;

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn render_pending(mode: OutputMode, message_id: &str) -> Result<String, CliError> {
    Ok(if mode.is_ndjson() {
        let mut out = serde_json::to_string(&serde_json::json!({
            "type": "summary",
            "status": "ok",
            "kind": "schedule",
            "messageId": message_id,
            "state": "pending",
        }))?;
        out.push('\n');
        out
    } else if mode.is_json() {
        let mut out = serde_json::to_string_pretty(&serde_json::json!({
            "status": "ok",
            "messageId": message_id,
            "state": "pending",
        }))?;
        out.push('\n');
        out
    } else {
        format!("status: ok\nmessageId: {message_id}\nstate: pending\n")
    })
}

fn render_terminal(mode: OutputMode, message_id: &str, receipt: &notifyhub_facade::ApiV1ReceiptDto) -> Result<String, CliError> {
    Ok(if mode.is_ndjson() {
        let mut out = serde_json::to_string(&serde_json::json!({
            "type": "summary",
            "status": "ok",
            "kind": "schedule",
            "messageId": message_id,
            "receipt": receipt,
        }))?;
        out.push('\n');
        out
    } else if mode.is_json() {
        let mut out = serde_json::to_string_pretty(&serde_json::json!({
            "status": "ok",
            "messageId": message_id,
            "receipt": receipt,
        }))?;
        out.push('\n');
        out
    } else {
        format!(
            "status: ok\nmessageId: {}\nreceiptStatus: {:?}\ntotal: {}\nsuccessful: {}\nfailed: {}\n",
            message_id, receipt.status, receipt.total, receipt.successful, receipt.failed
        )
    })
}
