// crates/opmatrix-core/src/core/outcome.rs
// ============================================================================
// Module: opmatrix Outcomes
// Description: Failure taxonomy, exit-code tables, execution results, and verdicts.
// Purpose: Make exit-code classification explicit and total per operation.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every observed process result is classified into exactly one
//! [`Classification`]: declared success, a declared failure class, an
//! unexpected exit code, or a harness-level fault. A [`Verdict`] passes only
//! when the observed classification equals the expected [`Outcome`]. Dry runs
//! that change observed state are reclassified as [`Classification::SideEffect`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::core::OperationName;
use crate::core::TestCaseId;
use crate::core::TestCategory;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit code reported for a process the invoker terminated at its budget.
///
/// Matches the coreutils `timeout` convention. Descriptors may not declare it.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

// ============================================================================
// SECTION: Failure Taxonomy
// ============================================================================

/// Failure classes the synthesizer deliberately provokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Required parameter missing or value outside its declared domain.
    Validation,
    /// Operation name is not registered with the console.
    UnknownOperation,
    /// Process exceeded its timeout budget.
    Timeout,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "ValidationError",
            Self::UnknownOperation => "UnknownOperationError",
            Self::Timeout => "TimeoutError",
        };
        f.write_str(label)
    }
}

/// Expected outcome of a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Operation must exit with its declared success code.
    Success,
    /// Operation must fail with the given class.
    Failure(FailureClass),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("Success"),
            Self::Failure(class) => class.fmt(f),
        }
    }
}

/// Observed classification of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Exit code matched the declared success code.
    Success,
    /// Exit code matched a declared failure class.
    Failure(FailureClass),
    /// Exit code is not declared anywhere in the applicable table.
    Unexpected(i32),
    /// Process crashed, was killed by a signal, or could not be started.
    ExecutionError,
    /// The harness itself misbehaved (scope overlap, probe failure, ...).
    HarnessInternalError,
    /// A dry run exited as declared but changed observable state.
    SideEffect,
}

impl Classification {
    /// Returns true when the classification satisfies the expected outcome.
    #[must_use]
    pub fn satisfies(self, expected: Outcome) -> bool {
        match (self, expected) {
            (Self::Success, Outcome::Success) => true,
            (Self::Failure(observed), Outcome::Failure(wanted)) => observed == wanted,
            _ => false,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("Success"),
            Self::Failure(class) => class.fmt(f),
            Self::Unexpected(code) => write!(f, "Unexpected({code})"),
            Self::ExecutionError => f.write_str("ExecutionError"),
            Self::HarnessInternalError => f.write_str("HarnessInternalError"),
            Self::SideEffect => f.write_str("SideEffectObserved"),
        }
    }
}

// ============================================================================
// SECTION: Exit Code Tables
// ============================================================================

/// Exit-code table used to classify a single test case.
///
/// # Invariants
/// - Codes are pairwise distinct and never equal [`TIMEOUT_EXIT_CODE`];
///   registration enforces this, so classification is total and unambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitCodeTable {
    /// Declared success code, if the table has one.
    success: Option<i32>,
    /// Declared failure classes and their codes.
    failures: Vec<(FailureClass, i32)>,
}

impl ExitCodeTable {
    /// Builds a table from a success code and failure mappings.
    #[must_use]
    pub const fn new(success: Option<i32>, failures: Vec<(FailureClass, i32)>) -> Self {
        Self {
            success,
            failures,
        }
    }

    /// Returns the declared success code.
    #[must_use]
    pub const fn success(&self) -> Option<i32> {
        self.success
    }

    /// Returns the code mapped to a failure class.
    #[must_use]
    pub fn failure_code(&self, class: FailureClass) -> Option<i32> {
        if class == FailureClass::Timeout {
            return Some(TIMEOUT_EXIT_CODE);
        }
        self.failures.iter().find(|(declared, _)| *declared == class).map(|(_, code)| *code)
    }

    /// Classifies an exit code observed without a timeout.
    #[must_use]
    pub fn classify_code(&self, code: i32) -> Classification {
        if self.success == Some(code) {
            return Classification::Success;
        }
        self.failures
            .iter()
            .find(|(_, declared)| *declared == code)
            .map_or(Classification::Unexpected(code), |(class, _)| Classification::Failure(*class))
    }

    /// Classifies a complete execution result.
    #[must_use]
    pub fn classify(&self, result: &ExecutionResult) -> Classification {
        if result.timed_out {
            return Classification::Failure(FailureClass::Timeout);
        }
        result.exit_code.map_or(Classification::ExecutionError, |code| self.classify_code(code))
    }
}

// ============================================================================
// SECTION: Execution Results
// ============================================================================

/// Raw result of one invocation.
///
/// Transient: discarded once a [`Verdict`] is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code; `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Wall-clock time from spawn to exit or termination.
    pub elapsed: Duration,
    /// True when the invoker terminated the process at its budget.
    pub timed_out: bool,
}

impl ExecutionResult {
    /// Builds a result for a process that exited on its own.
    #[must_use]
    pub const fn exited(
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        elapsed: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            elapsed,
            timed_out: false,
        }
    }

    /// Builds a result for a process terminated at its timeout budget.
    #[must_use]
    pub const fn timed_out(stdout: String, stderr: String, elapsed: Duration) -> Self {
        Self {
            exit_code: Some(TIMEOUT_EXIT_CODE),
            stdout,
            stderr,
            elapsed,
            timed_out: true,
        }
    }
}

/// Harness-level fault that prevented a normal execution result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessFault {
    /// The target process could not be run or its result could not be read.
    Execution(String),
    /// The harness violated one of its own invariants.
    Internal(String),
}

impl HarnessFault {
    /// Returns the classification reported for this fault.
    #[must_use]
    pub const fn classification(&self) -> Classification {
        match self {
            Self::Execution(_) => Classification::ExecutionError,
            Self::Internal(_) => Classification::HarnessInternalError,
        }
    }

    /// Returns the diagnostic message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Execution(message) | Self::Internal(message) => message,
        }
    }
}

// ============================================================================
// SECTION: Verdicts
// ============================================================================

/// Pass/fail judgment for one test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Test case identifier.
    pub case_id: TestCaseId,
    /// Operation that owns the test case.
    pub operation: OperationName,
    /// Category of the test case.
    pub category: TestCategory,
    /// True when the observed classification matched the expectation.
    pub passed: bool,
    /// Expected outcome.
    pub expected: Outcome,
    /// Observed classification.
    pub observed: Classification,
    /// Observed exit code, when the process produced one.
    pub exit_code: Option<i32>,
    /// Diagnostic reason for failed verdicts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
