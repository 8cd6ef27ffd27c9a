// crates/opmatrix-core/src/runtime/evaluator.rs
// ============================================================================
// Module: opmatrix Assertion Evaluator
// Description: Classifies execution results and produces verdicts.
// Purpose: Turn raw process results into pass/fail judgments per test case.
// Dependencies: crate::core, crate::interfaces, crate::runtime::registry
// ============================================================================

//! ## Overview
//! Each case is classified against exactly one exit-code table: the owning
//! descriptor's table for ordinary cases and the console contract's table
//! for unknown-operation cases. A verdict passes only when the observed
//! classification equals the expected outcome; failed verdicts carry a
//! reason naming both sides and the observed exit code.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::Classification;
use crate::core::ExecutionResult;
use crate::core::ExitCodeTable;
use crate::core::HarnessFault;
use crate::core::TestCase;
use crate::core::TestCategory;
use crate::core::Verdict;
use crate::interfaces::ProbeState;
use crate::runtime::registry::OperationRegistry;

// ============================================================================
// SECTION: Evaluator
// ============================================================================

/// Produces verdicts for executed test cases.
#[derive(Debug, Clone)]
pub struct AssertionEvaluator {
    /// Registry holding the exit-code tables.
    registry: Arc<OperationRegistry>,
}

impl AssertionEvaluator {
    /// Creates an evaluator over a registry.
    #[must_use]
    pub const fn new(registry: Arc<OperationRegistry>) -> Self {
        Self {
            registry,
        }
    }

    /// Returns the exit-code table that applies to a case.
    fn table_for(&self, case: &TestCase) -> Result<ExitCodeTable, HarnessFault> {
        if case.category() == TestCategory::UnknownOperation {
            return Ok(self.registry.console().exit_code_table());
        }
        self.registry
            .lookup(case.operation())
            .map(|descriptor| descriptor.exit_code_table())
            .map_err(|err| HarnessFault::Internal(err.to_string()))
    }

    /// Classifies a result without producing a verdict.
    #[must_use]
    pub fn classify(&self, case: &TestCase, result: &ExecutionResult) -> Classification {
        self.table_for(case)
            .map_or(Classification::HarnessInternalError, |table| table.classify(result))
    }

    /// Evaluates an execution result against the case expectation.
    #[must_use]
    pub fn evaluate(&self, case: &TestCase, result: &ExecutionResult) -> Verdict {
        let observed = match self.table_for(case) {
            Ok(table) => table.classify(result),
            Err(fault) => return self.evaluate_error(case, &fault),
        };
        let passed = observed.satisfies(case.expected());
        let reason = (!passed).then(|| {
            let code = result.exit_code.map_or_else(|| "none".to_string(), |code| code.to_string());
            format!("expected {}, observed {observed} (exit code {code})", case.expected())
        });
        Verdict {
            case_id: case.id().clone(),
            operation: case.operation().clone(),
            category: case.category(),
            passed,
            expected: case.expected(),
            observed,
            exit_code: result.exit_code,
            reason,
        }
    }

    /// Turns a harness-level fault into a failed verdict.
    #[must_use]
    pub fn evaluate_error(&self, case: &TestCase, fault: &HarnessFault) -> Verdict {
        Verdict {
            case_id: case.id().clone(),
            operation: case.operation().clone(),
            category: case.category(),
            passed: false,
            expected: case.expected(),
            observed: fault.classification(),
            exit_code: None,
            reason: Some(fault.message().to_string()),
        }
    }

    /// Fails a passing verdict when the side-effect probe saw a change.
    ///
    /// The observed classification becomes [`Classification::SideEffect`] so
    /// a failed verdict never reports a plain success.
    #[must_use]
    pub fn apply_probe(mut verdict: Verdict, before: &ProbeState, after: &ProbeState) -> Verdict {
        if verdict.passed && before != after {
            verdict.passed = false;
            verdict.observed = Classification::SideEffect;
            verdict.reason = Some("side effect observed during dry run".to_string());
        }
        verdict
    }
}
