//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Parser, Subcommand};
use commands::support::resolve_input;
use commands::{run_config_schema, run_config_show, run_health, run_info, run_schedule, run_schedule_batch, run_send, run_validate};
#[cfg(any(debug_assertions, feature = "dev-tools"))]
use commands::run_self_check;
use error::{CliError, ExitCode};
use format::{OutputArgs, OutputMode};
use notifyhub_facade::{ApiV1ErrorDto, ApiV1ErrorKind, InfraError, is_secret_key};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "notifyhub", version, about = "NotifyHub notification dispatch CLI", long_about = None)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate environment wiring and the executor lifecycle, no network calls.
    #[cfg(any(debug_assertions, feature = "dev-tools"))]
    SelfCheck,
    /// Show build and version details.
    Info,
    /// Config-related commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Validate a send-message request without sending it.
    Validate {
        /// Inline request JSON.
        #[arg(long)]
        input_json: Option<String>,
        /// Read the request JSON from stdin.
        #[arg(long)]
        stdin: bool,
    },
    /// Dispatch a message synchronously, bypassing the queue.
    Send {
        /// Inline request JSON.
        #[arg(long)]
        input_json: Option<String>,
        /// Read the request JSON from stdin.
        #[arg(long)]
        stdin: bool,
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Inline JSON config override object.
        #[arg(long)]
        overrides_json: Option<String>,
    },
    /// Enqueue a message for asynchronous delivery.
    Schedule {
        /// Inline request JSON.
        #[arg(long)]
        input_json: Option<String>,
        /// Read the request JSON from stdin.
        #[arg(long)]
        stdin: bool,
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Inline JSON config override object.
        #[arg(long)]
        overrides_json: Option<String>,
        /// Block up to this many milliseconds for the handle to settle.
        #[arg(long)]
        wait_ms: Option<u64>,
    },
    /// Enqueue a JSON array of messages as a single batch.
    ScheduleBatch {
        /// Inline request array JSON.
        #[arg(long)]
        input_json: Option<String>,
        /// Read the request array JSON from stdin.
        #[arg(long)]
        stdin: bool,
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Inline JSON config override object.
        #[arg(long)]
        overrides_json: Option<String>,
        /// Block up to this many milliseconds for the batch to settle.
        #[arg(long)]
        wait_ms: Option<u64>,
    },
    /// Liveness check across every registered platform adapter.
    Health {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Inline JSON config override object.
        #[arg(long)]
        overrides_json: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Print the effective config (file + env + overrides) as JSON.
    Show {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Inline JSON config override object.
        #[arg(long)]
        overrides_json: Option<String>,
    },
    /// Print the config's JSON Schema.
    Schema,
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);

    match run(&cli.command, mode).await {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

async fn run(command: &Commands, mode: OutputMode) -> Result<CliOutput, CliError> {
    match command {
        #[cfg(any(debug_assertions, feature = "dev-tools"))]
        Commands::SelfCheck => run_self_check(mode).await,
        Commands::Info => run_info(mode),
        Commands::Config { command } => match command {
            ConfigCommands::Show { config, overrides_json } => {
                let env = commands::support::collect_scoped_env("NOTIFYHUB_");
                run_config_show(mode, config.as_deref(), overrides_json.as_deref(), &env)
            },
            ConfigCommands::Schema => run_config_schema(mode),
        },
        Commands::Validate { input_json, stdin } => {
            let input = resolve_input(input_json.as_deref(), *stdin)?;
            run_validate(mode, &input)
        },
        Commands::Send { input_json, stdin, config, overrides_json } => {
            let input = resolve_input(input_json.as_deref(), *stdin)?;
            run_send(mode, &input, config.as_deref(), overrides_json.as_deref()).await
        },
        Commands::Schedule { input_json, stdin, config, overrides_json, wait_ms } => {
            let input = resolve_input(input_json.as_deref(), *stdin)?;
            run_schedule(mode, &input, config.as_deref(), overrides_json.as_deref(), *wait_ms).await
        },
        Commands::ScheduleBatch { input_json, stdin, config, overrides_json, wait_ms } => {
            let input = resolve_input(input_json.as_deref(), *stdin)?;
            run_schedule_batch(mode, &input, config.as_deref(), overrides_json.as_deref(), *wait_ms).await
        },
        Commands::Health { config, overrides_json } => run_health(mode, config.as_deref(), overrides_json.as_deref()).await,
    }
}

pub(crate) fn format_error_output(mode: OutputMode, error: &InfraError, exit_code: ExitCode) -> CliOutput {
    let api_error = sanitize_api_error(notifyhub_facade::error_envelope_to_api_v1_error(error, None));

    let mut stderr = String::new();
    log_info(&mut stderr, "command failed", mode.no_progress);

    let stdout = if mode.is_ndjson() {
        format_ndjson_error(&api_error)
    } else if mode.is_json() {
        let payload = serde_json::json!({
            "status": "error",
            "error": api_error,
        });
        let mut output = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| {
            "{\"status\":\"error\",\"error\":{\"code\":\"ERR_CORE_INTERNAL\",\"message\":\"internal error\",\"kind\":\"INVARIANT\"}}".to_string()
        });
        output.push('\n');
        output
    } else {
        format_api_error_text(&api_error)
    };

    CliOutput { stdout, stderr, exit_code }
}

pub(crate) fn infra_exit_code(error: &InfraError) -> ExitCode {
    match notifyhub_facade::error_envelope_to_api_v1_error(error, None).kind {
        ApiV1ErrorKind::Expected => ExitCode::InvalidInput,
        ApiV1ErrorKind::Invariant => ExitCode::Internal,
    }
}

fn sanitize_api_error(mut error: ApiV1ErrorDto) -> ApiV1ErrorDto {
    if let Some(meta) = error.meta.as_mut() {
        for (key, value) in meta.iter_mut() {
            if is_secret_key(key) {
                *value = "<redacted>".to_string();
            }
        }
    }
    error
}

fn format_api_error_text(error: &ApiV1ErrorDto) -> String {
    let mut out = String::new();
    out.push_str("status: error\n");
    out.push_str("code: ");
    out.push_str(&error.code);
    out.push('\n');
    out.push_str("message: ");
    out.push_str(&error.message);
    out.push('\n');
    out.push_str("kind: ");
    out.push_str(match error.kind {
        ApiV1ErrorKind::Expected => "EXPECTED",
        ApiV1ErrorKind::Invariant => "INVARIANT",
    });
    out.push('\n');

    if let Some(meta) = error.meta.as_ref()
        && !meta.is_empty()
    {
        out.push_str("meta:\n");
        for (key, value) in meta {
            out.push_str("  ");
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
    }

    out
}

fn log_info(stderr: &mut String, message: &str, no_progress: bool) {
    if no_progress {
        return;
    }
    stderr.push_str("info: ");
    stderr.push_str(message);
    stderr.push('\n');
}

fn format_ndjson_error(error: &ApiV1ErrorDto) -> String {
    let payload = serde_json::json!({
        "type": "error",
        "status": "error",
        "error": error,
    });
    let mut out = serde_json::to_string(&payload).unwrap_or_else(|_| {
        "{\"type\":\"error\",\"status\":\"error\",\"error\":{\"code\":\"ERR_CORE_INTERNAL\",\"message\":\"internal error\",\"kind\":\"INVARIANT\"}}".to_string()
    });
    out.push('\n');
    out
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}
