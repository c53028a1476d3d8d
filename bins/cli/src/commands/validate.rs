//! Validate command handler: check a send-message request without sending it.

use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, infra_exit_code};

/// Run the validate command: parse and validate `input_json` as a
/// [`notifyhub_facade::SendMessageRequest`], reporting ok or the first
/// validation failure.
pub fn run_validate(mode: OutputMode, input_json: &str) -> Result<CliOutput, CliError> {
    let message = match notifyhub_facade::validate_send_message_request_json(input_json) {
        Ok(message) => message,
        Err(error) => return Ok(format_error_output(mode, &error, infra_exit_code(&error))),
    };

    let stdout = if mode.is_ndjson() {
        let mut out = serde_json::to_string(&serde_json::json!({
            "type": "summary",
            "status": "ok",
            "kind": "validate",
            "messageId": message.id.as_str(),
            "targets": message.targets.len(),
        }))?;
        out.push('\n');
        out
    } else if mode.is_json() {
        let mut out = serde_json::to_string_pretty(&serde_json::json!({
            "status": "ok",
            "messageId": message.id.as_str(),
            "targets": message.targets.len(),
        }))?;
        out.push('\n');
        out
    } else {
        format!("status: ok\nmessageId: {}\ntargets: {}\n", message.id, message.targets.len())
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}
