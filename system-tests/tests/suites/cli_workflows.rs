// system-tests/tests/suites/cli_workflows.rs
// ============================================================================
// Module: CLI Workflow Tests
// Description: End-to-end opmatrix CLI runs against the stub console.
// Purpose: Validate config validation, listing, matrix output and run exit codes.
// Dependencies: system-tests helpers, serde_json
// ============================================================================

//! ## Overview
//! End-to-end opmatrix CLI runs against the stub console.
//! Purpose: Validate config validation, listing, matrix output and run exit codes.
//! Baseline comparisons replay recorded `matrix` output.
//! Invariants:
//! - Stdout carries one JSON document per line.
//! - Exit code 0 means every case ran and passed.

use std::fs;
use std::path::PathBuf;
use std::process::Output;

use helpers::cli::cli_binary;
use helpers::cli::run_cli;
use helpers::harness::ServiceHarness;
use serde_json::Value;
use serde_json::json;

use crate::helpers;

/// Resolves the CLI binary.
fn opmatrix() -> PathBuf {
    cli_binary().expect("opmatrix binary")
}

/// Runs the CLI against the harness config.
fn run(harness: &ServiceHarness, args: &[&str]) -> Output {
    let config = harness.config_path().display().to_string();
    let mut full: Vec<&str> = args.to_vec();
    full.extend(["--config", config.as_str()]);
    run_cli(&opmatrix(), &full).unwrap()
}

/// Parses stdout as JSON lines.
fn json_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn config_validate_accepts_the_service_config() {
    let harness = ServiceHarness::new();
    let output = run(&harness, &["config", "validate"]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "ok");
}

#[test]
fn operations_lists_every_descriptor() {
    let harness = ServiceHarness::new();
    let output = run(&harness, &["operations"]);
    assert!(output.status.success(), "{output:?}");
    let names: Vec<String> = json_lines(&output)
        .iter()
        .map(|line| line["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Health_Check", "Node_Replacement", "Upgrade"]);
}

#[test]
fn matrix_output_is_stable() {
    let harness = ServiceHarness::new();
    let first = run(&harness, &["matrix"]);
    let second = run(&harness, &["matrix"]);
    assert!(first.status.success(), "{first:?}");
    assert_eq!(first.stdout, second.stdout);
    for line in json_lines(&first) {
        assert_eq!(line["fingerprint"].as_str().map(str::len), Some(64));
    }

    let upgrade = run(&harness, &["matrix", "--operation", "Upgrade"]);
    let lines = json_lines(&upgrade);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["operation"], "Upgrade");
    assert_eq!(lines[0]["cases"].as_array().map(Vec::len), Some(11));
}

#[test]
fn run_exits_zero_when_every_case_passes() {
    let harness = ServiceHarness::new();
    let output = run(&harness, &["run", "--operation", "Health_Check"]);
    assert!(output.status.success(), "{output:?}");
    let reports = json_lines(&output);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["operation"], "Health_Check");
    assert_eq!(reports[0]["skipped"], 0);
}

#[test]
fn run_rejects_unknown_operations() {
    let harness = ServiceHarness::new();
    let output = run(&harness, &["run", "--operation", "Decommission"]);
    assert_eq!(output.status.code(), Some(1), "{output:?}");
    assert!(output.stdout.is_empty());
}

#[test]
fn run_with_probe_checks_dry_run_side_effects() {
    let harness = ServiceHarness::new();
    let probe = format!("Node_Replacement={}", harness.state_dir().display());
    let output = run(&harness, &["run", "--operation", "Node_Replacement", "--probe", &probe]);
    assert!(output.status.success(), "{output:?}");
    let reports = json_lines(&output);
    assert_eq!(reports.len(), 1);
    let verdicts = reports[0]["verdicts"].as_array().unwrap();
    assert!(verdicts.iter().all(|verdict| verdict["passed"] == true), "{verdicts:?}");
}

#[test]
fn matrix_baseline_reports_drifted_operations() {
    let harness = ServiceHarness::new();
    let recorded = run(&harness, &["matrix"]);
    assert!(recorded.status.success(), "{recorded:?}");
    let baseline = harness.root().join("baseline.jsonl");
    fs::write(&baseline, &recorded.stdout).unwrap();
    let baseline_arg = baseline.display().to_string();

    let unchanged = run(&harness, &["matrix", "--baseline", &baseline_arg]);
    assert!(unchanged.status.success(), "{unchanged:?}");
    assert!(unchanged.stdout.is_empty(), "{unchanged:?}");

    let stale = "0".repeat(64);
    let mut edited = String::new();
    for mut line in json_lines(&recorded) {
        let operation = line["operation"].as_str().map(str::to_string);
        match operation.as_deref() {
            Some("Node_Replacement") => continue,
            Some("Upgrade") => line["fingerprint"] = json!(stale),
            _ => {}
        }
        edited.push_str(&line.to_string());
        edited.push('\n');
    }
    edited.push_str(&json!({"operation": "Decommission", "fingerprint": stale}).to_string());
    fs::write(&baseline, edited).unwrap();

    let drifted = run(&harness, &["matrix", "--baseline", &baseline_arg]);
    assert_eq!(drifted.status.code(), Some(2), "{drifted:?}");
    let drift: Vec<(String, String)> = json_lines(&drifted)
        .iter()
        .map(|line| {
            let field = |name: &str| line[name].as_str().unwrap().to_string();
            (field("operation"), field("drift"))
        })
        .collect();
    assert_eq!(
        drift,
        vec![
            ("Decommission".to_string(), "removed".to_string()),
            ("Node_Replacement".to_string(), "added".to_string()),
            ("Upgrade".to_string(), "changed".to_string()),
        ]
    );

    let selected =
        run(&harness, &["matrix", "--baseline", &baseline_arg, "--operation", "Upgrade"]);
    assert_eq!(selected.status.code(), Some(2), "{selected:?}");
    let lines = json_lines(&selected);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["baseline"], json!(stale));
    assert_eq!(lines[0]["current"].as_str().map(str::len), Some(64));
}
