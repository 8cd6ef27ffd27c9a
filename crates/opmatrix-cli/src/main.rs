// crates/opmatrix-cli/src/main.rs
// ============================================================================
// Module: opmatrix CLI Entry Point
// Description: Command dispatcher for listing, synthesizing and running matrices.
// Purpose: Drive the operation matrix harness from a config file.
// Dependencies: clap, opmatrix-config, opmatrix-core, opmatrix-runner, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! `opmatrix` loads `opmatrix.toml`, then lists the registered operations,
//! prints their synthesized matrices, or runs them against the configured
//! console. Machine-readable output goes to stdout as JSON lines; logs and
//! errors go to stderr.
//!
//! `matrix --baseline FILE` compares the current fingerprints with an
//! earlier `matrix` output and prints one line per added, removed or changed
//! operation instead of the matrices.
//!
//! Exit codes: 0 on success, 1 on any harness error, 2 when a run produced
//! failed or skipped cases or a matrix drifted from its baseline.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use opmatrix_config::HarnessConfig;
use opmatrix_core::Fingerprint;
use opmatrix_core::FingerprintSet;
use opmatrix_core::MatrixDrift;
use opmatrix_core::MatrixSynthesizer;
use opmatrix_core::OperationName;
use opmatrix_core::OperationRegistry;
use opmatrix_core::TestMatrix;
use opmatrix_runner::FileProbe;
use opmatrix_runner::OperationReport;
use opmatrix_runner::RunnerSettings;
use opmatrix_runner::SuiteRunner;
use opmatrix_core::compare_fingerprints;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the log filter.
const LOG_ENV: &str = "OPMATRIX_LOG";
/// Filter used when `OPMATRIX_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "warn";
/// Filter used with `--verbose`.
const VERBOSE_LOG_FILTER: &str = "debug";
/// Exit code when a run produced failed or skipped cases.
const FAILED_CASES_EXIT_CODE: u8 = 2;
/// Exit code when a matrix drifted from its baseline.
const DRIFT_EXIT_CODE: u8 = 2;
/// Largest baseline file accepted, in bytes.
const MAX_BASELINE_FILE_SIZE: u64 = 16 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "opmatrix", disable_help_subcommand = true)]
struct Cli {
    /// Emit debug logs on stderr (overrides `OPMATRIX_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered operations as JSON lines.
    Operations(ConfigArgs),
    /// Print synthesized test matrices as JSON lines, or their drift from a baseline.
    Matrix(MatrixCommand),
    /// Run test matrices against the console and print one report per operation.
    Run(RunCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a config file.
    Validate(ConfigArgs),
}

/// Config file location.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Optional config file path (defaults to opmatrix.toml or `OPMATRIX_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config file plus an operation selection.
#[derive(Args, Debug)]
struct SelectArgs {
    /// Config file location.
    #[command(flatten)]
    config: ConfigArgs,
    /// Operation to include; repeat for several (defaults to all).
    #[arg(long = "operation", value_name = "NAME")]
    operations: Vec<String>,
}

/// Arguments for `matrix`.
#[derive(Args, Debug)]
struct MatrixCommand {
    /// Config file and operation selection.
    #[command(flatten)]
    select: SelectArgs,
    /// Earlier `matrix` output to compare fingerprints against.
    #[arg(long, value_name = "PATH")]
    baseline: Option<PathBuf>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Config file and operation selection.
    #[command(flatten)]
    select: SelectArgs,
    /// Directory watched for dry-run side effects, as `OPERATION=DIR`; repeatable.
    #[arg(long = "probe", value_name = "OPERATION=DIR", value_parser = parse_probe)]
    probes: Vec<(String, PathBuf)>,
}

// ============================================================================
// SECTION: Output Types
// ============================================================================

/// One `matrix` output line.
#[derive(Debug, Serialize)]
struct MatrixLine<'a> {
    /// Fingerprint of the matrix.
    fingerprint: Fingerprint,
    /// Synthesized matrix.
    #[serde(flatten)]
    matrix: &'a TestMatrix,
}

/// Fields read back from one line of earlier `matrix` output.
#[derive(Debug, Deserialize)]
struct BaselineLine {
    /// Operation the matrix belongs to.
    operation: OperationName,
    /// Recorded fingerprint.
    fingerprint: Fingerprint,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Operations(args) => command_operations(&args),
        Commands::Matrix(command) => command_matrix(&command),
        Commands::Run(command) => command_run(command).await,
        Commands::Config {
            command,
        } => command_config(&command),
    }
}

/// Installs the stderr log subscriber.
fn init_logging(verbose: bool) -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| CliError::new(format!("failed to install logger: {err}")))
}

/// Resolves the log filter from `--verbose` and the environment.
fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new(VERBOSE_LOG_FILTER);
    }
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `operations` command.
fn command_operations(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    for descriptor in &config.operations {
        write_json_line(descriptor)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `matrix` command.
fn command_matrix(command: &MatrixCommand) -> CliResult<ExitCode> {
    let args = &command.select;
    let config = load_config(&args.config)?;
    let registry = build_registry(&config)?;
    let baseline = command.baseline.as_deref().map(read_baseline).transpose()?;
    let synthesizer = MatrixSynthesizer::new(config.synthesis_options());
    let names = selected_operations(&registry, &args.operations);
    let mut current = FingerprintSet::new();
    for name in &names {
        let matrix = synthesizer
            .synthesize_for(&registry, name)
            .map_err(|err| CliError::new(format!("synthesis failed: {err}")))?;
        let fingerprint = matrix
            .fingerprint()
            .map_err(|err| CliError::new(format!("fingerprint failed: {err}")))?;
        if baseline.is_none() {
            write_json_line(&MatrixLine {
                fingerprint,
                matrix: &matrix,
            })?;
        } else {
            current.insert(name.clone(), fingerprint);
        }
    }
    let Some(mut baseline) = baseline else {
        return Ok(ExitCode::SUCCESS);
    };
    if !args.operations.is_empty() {
        baseline.retain(|operation, _| names.contains(operation));
    }
    let drift = compare_fingerprints(&baseline, &current);
    for entry in &drift {
        write_json_line(entry)?;
    }
    info!(operations = names.len(), drifted = drift.len(), "baseline compared");
    Ok(drift_exit_code(&drift))
}

/// Executes the `run` command.
async fn command_run(command: RunCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.select.config)?;
    let registry = Arc::new(build_registry(&config)?);
    let names = selected_operations(&registry, &command.select.operations);

    let settings = RunnerSettings {
        program: config.console.binary.clone(),
        default_timeout: config.default_timeout(),
        base_ambient: config.ambient.base.clone(),
        max_parallel_operations: config.limits.max_parallel_operations,
    };
    let mut runner = SuiteRunner::new(
        Arc::clone(&registry),
        MatrixSynthesizer::new(config.synthesis_options()),
        settings,
    );
    for (operation, dir) in command.probes {
        let operation = OperationName::new(operation);
        if !registry.contains(&operation) {
            return Err(CliError::new(format!("probe names unregistered operation {operation}")));
        }
        runner = runner.with_probe(operation, Arc::new(FileProbe::new(dir)));
    }

    let cancel = runner.cancel_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling suite");
            cancel.cancel();
        }
    });
    let outcome = runner.run(&names).await;
    interrupt.abort();
    let reports = outcome.map_err(|err| CliError::new(format!("run failed: {err}")))?;

    for report in &reports {
        write_json_line(report)?;
    }
    let incomplete = reports.iter().filter(|report| !report.all_passed()).count();
    info!(operations = reports.len(), incomplete, "suite finished");
    Ok(run_exit_code(&reports))
}

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(args) => {
            load_config(args)?;
            write_stdout_line("ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates the harness config.
fn load_config(args: &ConfigArgs) -> CliResult<HarnessConfig> {
    HarnessConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Builds the operation registry from a loaded config.
fn build_registry(config: &HarnessConfig) -> CliResult<OperationRegistry> {
    config.registry().map_err(|err| CliError::new(format!("invalid operations: {err}")))
}

/// Resolves `--operation` selections; none selects every registered operation.
fn selected_operations(registry: &OperationRegistry, requested: &[String]) -> Vec<OperationName> {
    if requested.is_empty() {
        return registry.names().to_vec();
    }
    requested.iter().map(OperationName::new).collect()
}

/// Returns the process exit code for a finished run.
fn run_exit_code(reports: &[OperationReport]) -> ExitCode {
    if reports.iter().all(OperationReport::all_passed) {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(FAILED_CASES_EXIT_CODE)
    }
}

/// Returns the process exit code for a baseline comparison.
fn drift_exit_code(drift: &[MatrixDrift]) -> ExitCode {
    if drift.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(DRIFT_EXIT_CODE)
    }
}

/// Reads a baseline file written by an earlier `matrix` command.
fn read_baseline(path: &Path) -> CliResult<FingerprintSet> {
    let display = path.display();
    let size = fs::metadata(path)
        .map_err(|err| CliError::new(format!("failed to read baseline {display}: {err}")))?
        .len();
    if size > MAX_BASELINE_FILE_SIZE {
        return Err(CliError::new(format!("baseline {display} exceeds size limit")));
    }
    let text = fs::read_to_string(path)
        .map_err(|err| CliError::new(format!("failed to read baseline {display}: {err}")))?;
    parse_baseline(&text).map_err(|err| CliError::new(format!("baseline {display}: {err}")))
}

/// Parses `matrix` JSON lines into fingerprints; blank lines are skipped.
fn parse_baseline(text: &str) -> Result<FingerprintSet, String> {
    let mut fingerprints = FingerprintSet::new();
    for (index, line) in text.lines().enumerate().filter(|(_, line)| !line.trim().is_empty()) {
        let number = index + 1;
        let entry: BaselineLine =
            serde_json::from_str(line).map_err(|err| format!("line {number}: {err}"))?;
        if fingerprints.insert(entry.operation.clone(), entry.fingerprint).is_some() {
            return Err(format!("line {number}: duplicate operation {}", entry.operation));
        }
    }
    Ok(fingerprints)
}

/// Parses an `OPERATION=DIR` probe argument.
fn parse_probe(raw: &str) -> Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((operation, dir)) if !operation.is_empty() && !dir.is_empty() => {
            Ok((operation.to_string(), PathBuf::from(dir)))
        }
        _ => Err(format!("expected OPERATION=DIR, got {raw:?}")),
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a value as one compact JSON line to stdout.
fn write_json_line<T: Serialize>(value: &T) -> CliResult<()> {
    let line = serde_json::to_string(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
