//! Send command handler: synchronous dispatch, bypassing the queue.

use super::support::{build_adapters, build_config, collect_scoped_env, parse_overrides};
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, infra_exit_code};
use notifyhub_facade::Client;
use std::path::Path;

/// Run the send command: validate `input_json`, dispatch it through every
/// adapter its targets resolve to, and print the aggregated receipt.
pub async fn run_send(mode: OutputMode, input_json: &str, config_path: Option<&Path>, overrides_json: Option<&str>) -> Result<CliOutput, CliError> {
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
    let receipt = match client.send(&message).await {
        Ok(receipt) => receipt,
        Err(error) => return Ok(format_error_output(mode, &error, infra_exit_code(&error))),
    };
    let dto = notifyhub_facade::receipt_to_api_v1(&receipt);

    let stdout = if mode.is_ndjson() {
        let mut out = serde_json::to_string(&serde_json::json!({
            "type": "summary",
            "status": "ok",
            "kind": "send",
            "receipt": dto,
        }))?;
        out.push('\n');
        out
    } else if mode.is_json() {
        let mut out = serde_json::to_string_pretty(&serde_json::json!({
            "status": "ok",
            "receipt": dto,
        }))?;
        out.push('\n');
        out
    } else {
        format!(
            "status: ok\nmessageId: {}\nreceiptStatus: {:?}\ntotal: {}\nsuccessful: {}\nfailed: {}\n",
            dto.message_id, dto.status, dto.total, dto.successful, dto.failed
        )
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}
