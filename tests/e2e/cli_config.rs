//! End-to-end tests for the `config` subcommand tree.

use std::process::Command;

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
fn config_show_reports_defaults() -> std::io::Result<()> {
    let output = run_cli(&["--output", "json", "config", "show"])?;
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["status"], "ok");
    assert!(value["config"]["queue"]["capacity"].is_u64());
    Ok(())
}

#[test]
fn config_show_applies_overrides() -> std::io::Result<()> {
    let output = run_cli(&["--output", "json", "config", "show", "--overrides-json", r#"{"queueCapacity":4321}"#])?;
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["config"]["queue"]["capacity"], 4321);
    Ok(())
}

#[test]
fn config_show_rejects_invalid_overrides_json() -> std::io::Result<()> {
    let output = run_cli(&["config", "show", "--overrides-json", "not json"])?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn config_schema_exports_top_level_properties() -> std::io::Result<()> {
    let output = run_cli(&["config", "schema"])?;
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert!(value["properties"]["workerPool"].is_object());
    Ok(())
}
