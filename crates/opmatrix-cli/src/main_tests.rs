// crates/opmatrix-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and run exit codes.
// Purpose: Ensure the command surface and selection helpers behave as documented.
// Dependencies: opmatrix-cli main helpers
// ============================================================================

//! ## Overview
//! Exercises clap parsing, probe arguments, operation selection, baseline
//! files and the exit codes derived from run reports and matrix drift.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;

use clap::CommandFactory;
use clap::Parser;
use opmatrix_core::Classification;
use opmatrix_core::DriftKind;
use opmatrix_core::ConsoleContract;
use opmatrix_core::Fingerprint;
use opmatrix_core::MatrixDrift;
use opmatrix_core::OperationDescriptor;
use opmatrix_core::OperationName;
use opmatrix_core::OperationRegistry;
use opmatrix_core::Outcome;
use opmatrix_core::TestCaseId;
use opmatrix_core::TestCategory;
use opmatrix_core::Verdict;
use opmatrix_core::fingerprint;
use opmatrix_runner::OperationReport;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::drift_exit_code;
use super::load_config;
use super::parse_baseline;
use super::parse_probe;
use super::read_baseline;
use super::run_exit_code;
use super::selected_operations;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn registry() -> OperationRegistry {
    let mut registry = OperationRegistry::new(ConsoleContract::default()).unwrap();
    registry.register(OperationDescriptor::new("Health_Check")).unwrap();
    registry.register(OperationDescriptor::new("Upgrade")).unwrap();
    registry
}

fn report(passed: bool, skipped: usize) -> OperationReport {
    let digest: Fingerprint = fingerprint(&"matrix").unwrap();
    OperationReport {
        operation: OperationName::new("Health_Check"),
        fingerprint: digest,
        verdicts: vec![Verdict {
            case_id: TestCaseId::new("Health_Check::smoke"),
            operation: OperationName::new("Health_Check"),
            category: TestCategory::Smoke,
            passed,
            expected: Outcome::Success,
            observed: Classification::Success,
            exit_code: Some(0),
            reason: None,
        }],
        skipped,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn command_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn run_accepts_repeated_operations_and_probes() {
    let cli = Cli::try_parse_from([
        "opmatrix",
        "--verbose",
        "run",
        "--config",
        "svc.toml",
        "--operation",
        "Health_Check",
        "--operation",
        "Upgrade",
        "--probe",
        "Upgrade=/var/lib/svc",
    ])
    .unwrap();
    assert!(cli.verbose);
    let Some(Commands::Run(command)) = cli.command else {
        panic!("expected run command");
    };
    assert_eq!(command.select.config.config, Some(PathBuf::from("svc.toml")));
    assert_eq!(command.select.operations, vec!["Health_Check", "Upgrade"]);
    assert_eq!(command.probes, vec![("Upgrade".to_string(), PathBuf::from("/var/lib/svc"))]);
}

#[test]
fn config_validate_parses() {
    let cli = Cli::try_parse_from(["opmatrix", "config", "validate", "--config", "svc.toml"]).unwrap();
    let Some(Commands::Config {
        command: ConfigCommand::Validate(args),
    }) = cli.command
    else {
        panic!("expected config validate");
    };
    assert_eq!(args.config, Some(PathBuf::from("svc.toml")));
}

#[test]
fn probe_arguments_require_both_halves() {
    assert_eq!(parse_probe("Upgrade=dir").unwrap(), ("Upgrade".to_string(), PathBuf::from("dir")));
    assert!(parse_probe("Upgrade").is_err());
    assert!(parse_probe("=dir").is_err());
    assert!(parse_probe("Upgrade=").is_err());
}

#[test]
fn empty_selection_means_every_operation() {
    let registry = registry();
    let all: Vec<String> =
        selected_operations(&registry, &[]).iter().map(ToString::to_string).collect();
    assert_eq!(all, vec!["Health_Check", "Upgrade"]);
    let some = selected_operations(&registry, &["Upgrade".to_string()]);
    assert_eq!(some, vec![OperationName::new("Upgrade")]);
}

#[test]
fn run_exit_code_reflects_failures_and_skips() {
    assert_eq!(run_exit_code(&[report(true, 0)]), ExitCode::SUCCESS);
    assert_eq!(run_exit_code(&[report(true, 0), report(false, 0)]), ExitCode::from(2));
    assert_eq!(run_exit_code(&[report(true, 3)]), ExitCode::from(2));
}

#[test]
fn load_config_reports_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let args = super::ConfigArgs {
        config: Some(dir.path().join("absent.toml")),
    };
    let err = load_config(&args).unwrap_err();
    assert!(err.to_string().starts_with("failed to load config"), "{err}");
}

#[test]
fn matrix_accepts_a_baseline() {
    let cli = Cli::try_parse_from([
        "opmatrix",
        "matrix",
        "--baseline",
        "matrices.jsonl",
        "--operation",
        "Upgrade",
    ])
    .unwrap();
    let Some(Commands::Matrix(command)) = cli.command else {
        panic!("expected matrix command");
    };
    assert_eq!(command.baseline, Some(PathBuf::from("matrices.jsonl")));
    assert_eq!(command.select.operations, vec!["Upgrade"]);
}

#[test]
fn baseline_lines_keep_only_operation_and_fingerprint() {
    let digest = Fingerprint::of_bytes(b"upgrade");
    let text = format!(
        "{{\"fingerprint\":\"{digest}\",\"operation\":\"Upgrade\",\"cases\":[]}}\n\n  \n"
    );
    let baseline = parse_baseline(&text).unwrap();
    assert_eq!(baseline.len(), 1);
    assert_eq!(baseline.get(&OperationName::new("Upgrade")), Some(&digest));
}

#[test]
fn baseline_rejects_duplicates_and_malformed_lines() {
    let line = r#"{"fingerprint":"ab","operation":"Upgrade"}"#;
    let err = parse_baseline(&format!("{line}\n{line}\n")).unwrap_err();
    assert!(err.starts_with("line 2: duplicate operation Upgrade"), "{err}");

    let err = parse_baseline("\n{\"operation\":\"Upgrade\"}\n").unwrap_err();
    assert!(err.starts_with("line 2:"), "{err}");
}

#[test]
fn missing_baseline_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_baseline(&dir.path().join("absent.jsonl")).unwrap_err();
    assert!(err.to_string().starts_with("failed to read baseline"), "{err}");
}

#[test]
fn drift_exit_code_reflects_any_drift() {
    assert_eq!(drift_exit_code(&[]), ExitCode::SUCCESS);
    let drift = MatrixDrift {
        operation: OperationName::new("Upgrade"),
        drift: DriftKind::Removed,
        baseline: Some(Fingerprint::of_bytes(b"upgrade")),
        current: None,
    };
    assert_eq!(drift_exit_code(&[drift]), ExitCode::from(2));
}
