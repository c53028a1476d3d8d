//! End-to-end smoke tests: the `notifyhub` binary starts, parses its
//! top-level commands, and reports build info.

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
fn version_flag_exits_zero() -> std::io::Result<()> {
    let output = run_cli(&["--version"])?;
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("notifyhub"));
    Ok(())
}

#[test]
fn info_reports_build_metadata() -> std::io::Result<()> {
    let output = run_cli(&["--output", "json", "info"])?;
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["status"], "ok");
    assert!(value["build"]["facadeVersion"].is_string());
    Ok(())
}

#[test]
fn missing_subcommand_exits_nonzero() -> std::io::Result<()> {
    let output = run_cli(&[])?;
    assert!(!output.status.success());
    Ok(())
}
