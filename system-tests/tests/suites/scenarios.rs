// system-tests/tests/suites/scenarios.rs
// ============================================================================
// Module: Console Scenario Tests
// Description: End-to-end matrix runs against the service console stub.
// Purpose: Validate smoke, validation, unknown-operation, timeout and dry-run cases.
// Dependencies: system-tests helpers, opmatrix-core, opmatrix-runner
// ============================================================================

//! ## Overview
//! End-to-end matrix runs against the service console stub.
//! Purpose: Validate smoke, validation, unknown-operation, timeout and dry-run cases.
//! Invariants:
//! - Every expected outcome is derived from the declared exit-code tables.
//! - Dry-run cases leave the console state directory untouched.

use std::fs;
use std::sync::Arc;

use helpers::harness::ServiceHarness;
use opmatrix_core::Classification;
use opmatrix_core::FailureClass;
use opmatrix_core::OperationName;
use opmatrix_core::Outcome;
use opmatrix_core::TIMEOUT_EXIT_CODE;
use opmatrix_core::TestCategory;
use opmatrix_runner::FileProbe;
use opmatrix_runner::OperationReport;

use crate::helpers;

/// Returns the first verdict in a category.
fn verdict_in(report: &OperationReport, category: TestCategory) -> &opmatrix_core::Verdict {
    report
        .verdicts
        .iter()
        .find(|verdict| verdict.category == category)
        .unwrap_or_else(|| panic!("no {category} verdict in {report:?}"))
}

#[tokio::test(flavor = "multi_thread")]
async fn health_check_smoke_case_succeeds() {
    let harness = ServiceHarness::new();
    let runner = harness.runner();
    let name = OperationName::new("Health_Check");
    let matrix = runner.matrices(std::slice::from_ref(&name)).unwrap().remove(0);
    let smoke: Vec<_> = matrix.in_category(TestCategory::Smoke).collect();
    assert_eq!(smoke.len(), 1);
    assert_eq!(smoke[0].argv(), ["run", "Health_Check"]);

    let report = runner.run_operation(&name).await.unwrap();
    let verdict = verdict_in(&report, TestCategory::Smoke);
    assert!(verdict.passed, "{verdict:?}");
    assert_eq!(verdict.exit_code, Some(0));
    assert_eq!(verdict.observed, Classification::Success);
}

#[tokio::test(flavor = "multi_thread")]
async fn node_replacement_without_node_id_is_a_validation_failure() {
    let harness = ServiceHarness::new();
    let report =
        harness.runner().run_operation(&OperationName::new("Node_Replacement")).await.unwrap();
    let verdict = verdict_in(&report, TestCategory::MissingRequired);
    assert!(verdict.passed, "{verdict:?}");
    assert_eq!(verdict.expected, Outcome::Failure(FailureClass::Validation));
    assert_eq!(verdict.exit_code, Some(1));
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_operation_cases_exit_with_the_console_code() {
    let harness = ServiceHarness::new();
    let reports = harness.runner().run_all().await.unwrap();
    assert_eq!(reports.len(), 3);
    for report in &reports {
        let verdict = verdict_in(report, TestCategory::UnknownOperation);
        assert!(verdict.passed, "{verdict:?}");
        assert_eq!(verdict.exit_code, Some(1));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn upgrade_timeout_case_is_killed_at_its_budget() {
    let harness = ServiceHarness::new();
    let runner = harness.runner();
    let name = OperationName::new("Upgrade");
    let matrix = runner.matrices(std::slice::from_ref(&name)).unwrap().remove(0);
    let timeout: Vec<_> = matrix.in_category(TestCategory::Timeout).collect();
    assert_eq!(timeout.len(), 1);
    assert_eq!(timeout[0].timeout_budget_ms(), Some(100));

    let report = runner.run_operation(&name).await.unwrap();
    let verdict = verdict_in(&report, TestCategory::Timeout);
    assert!(verdict.passed, "{verdict:?}");
    assert_eq!(verdict.exit_code, Some(TIMEOUT_EXIT_CODE));
    assert_eq!(verdict.observed, Classification::Failure(FailureClass::Timeout));
}

#[tokio::test(flavor = "multi_thread")]
async fn side_effect_free_operations_report_identically_across_runs() {
    let harness = ServiceHarness::new();
    let runner = harness.runner();
    let name = OperationName::new("Health_Check");
    let first = runner.run_operation(&name).await.unwrap();
    let second = runner.run_operation(&name).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread")]
async fn node_replacement_dry_run_leaves_state_untouched() {
    let harness = ServiceHarness::new();
    let name = OperationName::new("Node_Replacement");
    let report = harness
        .runner()
        .with_probe(name.clone(), Arc::new(FileProbe::new(harness.state_dir())))
        .run_operation(&name)
        .await
        .unwrap();
    let verdict = verdict_in(&report, TestCategory::DryRun);
    assert!(verdict.passed, "{verdict:?}");
    assert!(report.all_passed(), "{report:?}");

    let log = fs::read_to_string(harness.state_dir().join("replacements.log")).unwrap();
    let replaced: Vec<&str> = log.lines().collect();
    assert_eq!(replaced, vec!["node-1"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn full_suite_passes_against_a_conforming_console() {
    let harness = ServiceHarness::new();
    let reports = harness.runner().run_all().await.unwrap();
    let names: Vec<&str> = reports.iter().map(|report| report.operation.as_str()).collect();
    assert_eq!(names, vec!["Health_Check", "Node_Replacement", "Upgrade"]);
    for report in &reports {
        assert!(report.all_passed(), "{report:?}");
    }
}
