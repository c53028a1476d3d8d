//! Print the effective NotifyHub config (defaults + env overrides) as JSON.

use notifyhub_config::{NotifyHubConfig, NotifyHubEnv};
use std::io;
use std::io::Write;

fn main() -> std::process::ExitCode {
    match run() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::ExitCode::from(1)
        },
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let env = NotifyHubEnv::from_std_env()?;
    let config = env.apply(NotifyHubConfig::default()).validate_and_normalize()?;

    let mut output = serde_json::to_string_pretty(config.as_ref())?;
    output.push('\n');

    let mut stdout = io::stdout();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;

    Ok(())
}
