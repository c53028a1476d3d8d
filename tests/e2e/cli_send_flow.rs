//! End-to-end tests for `validate`, `send`, and `schedule`, using an
//! unconfigured platform (`smtp` with no `NOTIFYHUB_SMTP_*` credentials) so
//! dispatch fails deterministically per-target without any network access.

use std::process::Command;

const REQUEST_UNCONFIGURED_PLATFORM: &str = r#"{
    "title": "hello",
    "body": "world",
    "targets": [{"targetType": "email", "value": "a@example.com", "platform": "smtp"}]
}"#;

fn run_cli(args: &[&str]) -> std::io::Result<std::process::Output> {
    let mut command = Command::new(env!("CARGO_BIN_EXE_notifyhub"));
    command.args(args);
    for (key, _) in std::env::vars() {
        if key.starts_with("NOTIFYHUB_") {
            command.env_remove(key);
        }
    }
    command.output()
}

#[test]
fn validate_accepts_well_formed_request() -> std::io::Result<()> {
    let output = run_cli(&["--output", "json", "validate", "--input-json", REQUEST_UNCONFIGURED_PLATFORM])?;
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["status"], "ok");
    assert_eq!(value["targets"], 1);
    Ok(())
}

#[test]
fn validate_rejects_request_with_no_targets() -> std::io::Result<()> {
    let output = run_cli(&["--output", "json", "validate", "--input-json", r#"{"title":"hi","body":"there","targets":[]}"#])?;
    assert!(!output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["status"], "error");
    Ok(())
}

#[test]
fn send_reports_per_target_failure_for_unconfigured_platform() -> std::io::Result<()> {
    let output = run_cli(&["--output", "json", "send", "--input-json", REQUEST_UNCONFIGURED_PLATFORM])?;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["status"], "ok");
    assert_eq!(value["receipt"]["status"], "failed");
    assert_eq!(value["receipt"]["successful"], 0);
    assert_eq!(value["receipt"]["results"][0]["error"], "unknown platform");
    Ok(())
}

#[test]
fn schedule_settles_within_wait_window() -> std::io::Result<()> {
    let output = run_cli(&["--output", "json", "schedule", "--input-json", REQUEST_UNCONFIGURED_PLATFORM, "--wait-ms", "2000"])?;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["status"], "ok");
    assert!(value["messageId"].is_string());
    assert_eq!(value["receipt"]["status"], "failed");
    Ok(())
}

#[test]
fn send_requires_input() -> std::io::Result<()> {
    let output = run_cli(&["send"])?;
    assert!(!output.status.success());
    Ok(())
}
