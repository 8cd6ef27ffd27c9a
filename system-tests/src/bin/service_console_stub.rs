// system-tests/src/bin/service_console_stub.rs
// ============================================================================
// Module: Service Console Stub
// Description: Fake administrative console used as the system-test target.
// Purpose: Provide a deterministic console with known exit-code contracts.
// Dependencies: clap
// ============================================================================

//! ## Overview
//! `service-console-stub run <Operation> [args]` implements three operations:
//!
//! - `Health_Check [--nodes 1..64] [--services api|db|cache]`: prints a
//!   status line; never mutates anything.
//! - `Upgrade --version X.Y.Z [--force] [--release-note TEXT]`: works for
//!   `UPGRADE_DURATION_MS` (default 1500) unless `DRY_RUN=1`.
//! - `Node_Replacement` with `NODE_ID=node-N` in the environment: appends to
//!   `$SERVICE_STATE_DIR/replacements.log` unless `DRY_RUN=1`.
//!
//! Exit codes: 0 success, 1 validation failure or unknown operation.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

/// Exit code for rejected input and unknown operations.
const VALIDATION_EXIT_CODE: u8 = 1;
/// Upgrade duration when `UPGRADE_DURATION_MS` is unset.
const DEFAULT_UPGRADE_DURATION_MS: u64 = 1500;
/// Longest accepted release note.
const MAX_RELEASE_NOTE_LEN: usize = 256;

/// Console command line.
#[derive(Parser, Debug)]
#[command(name = "service-console-stub")]
struct Console {
    /// Console command.
    #[command(subcommand)]
    command: ConsoleCommand,
}

/// Console commands.
#[derive(Subcommand, Debug)]
enum ConsoleCommand {
    /// Run an administrative operation.
    Run {
        /// Operation name.
        operation: String,
        /// Operation arguments.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

/// `Health_Check` arguments.
#[derive(Parser, Debug)]
struct HealthCheckArgs {
    /// Number of nodes to probe.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=64))]
    nodes: Option<u8>,
    /// Service to probe.
    #[arg(long, value_enum)]
    services: Option<Service>,
}

/// Services the health check knows.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum Service {
    /// API tier.
    Api,
    /// Database tier.
    Db,
    /// Cache tier.
    Cache,
}

/// `Upgrade` arguments.
#[derive(Parser, Debug)]
struct UpgradeArgs {
    /// Target version.
    #[arg(long, value_parser = parse_version)]
    version: String,
    /// Skip compatibility checks.
    #[arg(long)]
    force: bool,
    /// Operator note recorded with the upgrade.
    #[arg(long = "release-note", value_parser = parse_release_note)]
    release_note: Option<String>,
}

/// Parses the command line and runs the requested operation.
fn main() -> ExitCode {
    let Ok(console) = Console::try_parse() else {
        return ExitCode::from(2);
    };
    let ConsoleCommand::Run {
        operation,
        args,
    } = console.command;
    let argv = std::iter::once(operation.clone()).chain(args);
    let result = match operation.as_str() {
        "Health_Check" => HealthCheckArgs::try_parse_from(argv)
            .map_err(|err| err.to_string())
            .and_then(|args| health_check(&args)),
        "Upgrade" => UpgradeArgs::try_parse_from(argv)
            .map_err(|err| err.to_string())
            .and_then(|args| upgrade(&args)),
        "Node_Replacement" => node_replacement(),
        other => Err(format!("unknown operation: {other}")),
    };
    match result {
        Ok(message) => {
            let _ = writeln!(std::io::stdout(), "{message}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            let _ = writeln!(std::io::stderr(), "{message}");
            ExitCode::from(VALIDATION_EXIT_CODE)
        }
    }
}

/// Reports health for the selected nodes and service.
fn health_check(args: &HealthCheckArgs) -> Result<String, String> {
    let nodes = args.nodes.unwrap_or(1);
    let services = args.services.map_or("all", |service| match service {
        Service::Api => "api",
        Service::Db => "db",
        Service::Cache => "cache",
    });
    Ok(format!("healthy nodes={nodes} services={services}"))
}

/// Performs or previews an upgrade.
fn upgrade(args: &UpgradeArgs) -> Result<String, String> {
    if dry_run() {
        return Ok(format!("would upgrade to {}", args.version));
    }
    let duration = match std::env::var("UPGRADE_DURATION_MS") {
        Ok(raw) => raw.parse().map_err(|_| format!("invalid UPGRADE_DURATION_MS: {raw}"))?,
        Err(_) => DEFAULT_UPGRADE_DURATION_MS,
    };
    std::thread::sleep(Duration::from_millis(duration));
    let note = args.release_note.as_deref().unwrap_or("none");
    Ok(format!("upgraded to {} force={} note={note}", args.version, args.force))
}

/// Replaces the node named by `NODE_ID`.
fn node_replacement() -> Result<String, String> {
    let node = std::env::var("NODE_ID").map_err(|_| "NODE_ID is required".to_string())?;
    let valid = node
        .strip_prefix("node-")
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()));
    if !valid {
        return Err(format!("invalid NODE_ID: {node:?}"));
    }
    if dry_run() {
        return Ok(format!("would replace {node}"));
    }
    if let Ok(dir) = std::env::var("SERVICE_STATE_DIR") {
        let path = PathBuf::from(dir).join("replacements.log");
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| format!("state write failed: {err}"))?;
        writeln!(log, "{node}").map_err(|err| format!("state write failed: {err}"))?;
    }
    Ok(format!("replaced {node}"))
}

/// Returns true when `DRY_RUN=1`.
fn dry_run() -> bool {
    std::env::var("DRY_RUN").is_ok_and(|value| value == "1")
}

/// Accepts `X.Y.Z` with numeric components.
fn parse_version(raw: &str) -> Result<String, String> {
    let parts: Vec<&str> = raw.split('.').collect();
    let valid = parts.len() == 3
        && parts.iter().all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));
    if valid { Ok(raw.to_string()) } else { Err(format!("invalid version {raw:?}")) }
}

/// Accepts short notes made of plain characters.
fn parse_release_note(raw: &str) -> Result<String, String> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '-' | '_');
    if raw.is_empty() || raw.len() > MAX_RELEASE_NOTE_LEN || !raw.chars().all(allowed) {
        return Err("release note must be 1-256 plain characters".to_string());
    }
    Ok(raw.to_string())
}
