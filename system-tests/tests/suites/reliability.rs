// system-tests/tests/suites/reliability.rs
// ============================================================================
// Module: Reliability Tests
// Description: Cancellation, spawn failure, determinism and contract drift.
// Purpose: Ensure runs fail closed and report what they did not execute.
// Dependencies: system-tests helpers, opmatrix-config, opmatrix-core, opmatrix-runner
// ============================================================================

//! ## Overview
//! Cancellation, spawn failure, determinism and contract drift.
//! Purpose: Ensure runs fail closed and report what they did not execute.
//! Invariants:
//! - Every synthesized case is either judged or counted as skipped.
//! - Matrix fingerprints depend only on the registered descriptors.

use std::time::Duration;

use helpers::harness::ServiceHarness;
use helpers::harness::runner_for;
use helpers::harness::service_config_toml;
use helpers::harness::stub_console;
use opmatrix_config::HarnessConfig;
use opmatrix_core::Classification;
use opmatrix_core::OperationName;
use opmatrix_core::TestCategory;

use crate::helpers;

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_fails_the_running_case_and_skips_the_rest() {
    let harness = ServiceHarness::new();
    let runner = harness.runner();
    let name = OperationName::new("Upgrade");
    let total = runner.matrices(std::slice::from_ref(&name)).unwrap()[0].len();
    let cancel = runner.cancel_handle();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
    });

    let report = runner.run_operation(&name).await.unwrap();
    canceller.await.unwrap();
    assert_eq!(report.verdicts.len(), 1, "{report:?}");
    let verdict = &report.verdicts[0];
    assert_eq!(verdict.category, TestCategory::Smoke);
    assert!(!verdict.passed);
    assert_eq!(verdict.observed, Classification::ExecutionError);
    assert_eq!(verdict.reason.as_deref(), Some("cancelled"));
    assert_eq!(report.verdicts.len() + report.skipped, total);
    assert!(!report.all_passed());
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_console_binary_yields_execution_errors() {
    let probe = ServiceHarness::new();
    let missing = probe.root().join("no-such-console");
    let harness = ServiceHarness::with_binary(&missing);
    let report =
        harness.runner().run_operation(&OperationName::new("Health_Check")).await.unwrap();
    assert!(!report.verdicts.is_empty());
    assert_eq!(report.skipped, 0);
    for verdict in &report.verdicts {
        assert!(!verdict.passed, "{verdict:?}");
        assert_eq!(verdict.observed, Classification::ExecutionError);
        assert_eq!(verdict.exit_code, None);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn fingerprints_are_stable_across_runs() {
    let harness = ServiceHarness::new();
    let names = [OperationName::new("Health_Check"), OperationName::new("Node_Replacement")];
    let matrices = harness.runner().matrices(&names).unwrap();
    let first = harness.runner().run(&names).await.unwrap();
    let second = harness.runner().run(&names).await.unwrap();
    for ((matrix, a), b) in matrices.iter().zip(&first).zip(&second) {
        let digest = matrix.fingerprint().unwrap();
        assert_eq!(a.fingerprint, digest);
        assert_eq!(b.fingerprint, digest);
    }

    let other = ServiceHarness::new();
    let rebuilt = other.runner().matrices(&names).unwrap();
    assert_eq!(matrices, rebuilt);
}

#[tokio::test(flavor = "multi_thread")]
async fn exit_code_contract_drift_fails_invalid_value_cases() {
    let harness = ServiceHarness::new();
    let drifted = service_config_toml(
        &stub_console(),
        harness.state_dir(),
        harness.config().default_timeout(),
    )
    .replacen(
        r#"failure_exit_codes = [{ class = "validation", exit_code = 1 }]"#,
        r#"failure_exit_codes = [{ class = "validation", exit_code = 3 }]"#,
        1,
    );
    let config = HarnessConfig::from_toml(&drifted).unwrap();
    let report =
        runner_for(&config).run_operation(&OperationName::new("Health_Check")).await.unwrap();

    let smoke = report
        .verdicts
        .iter()
        .find(|verdict| verdict.category == TestCategory::Smoke)
        .unwrap();
    assert!(smoke.passed, "{smoke:?}");
    let invalid: Vec<_> = report
        .verdicts
        .iter()
        .filter(|verdict| verdict.category == TestCategory::InvalidValue)
        .collect();
    assert!(!invalid.is_empty());
    for verdict in invalid {
        assert!(!verdict.passed, "{verdict:?}");
        assert_eq!(verdict.exit_code, Some(1));
    }
    assert!(!report.all_passed());
}
