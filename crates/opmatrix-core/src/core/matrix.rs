// crates/opmatrix-core/src/core/matrix.rs
// ============================================================================
// Module: opmatrix Test Matrix
// Description: Test categories, immutable test cases, and per-operation matrices.
// Purpose: Carry synthesized cases from the synthesizer to the runner unchanged.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! A [`TestMatrix`] is the ordered list of [`TestCase`]s synthesized for one
//! descriptor. Cases are immutable: fields are private and only the
//! synthesizer constructs them. Matrices serialize to canonical JSON for
//! fingerprinting and output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::AmbientOverrides;
use crate::core::Fingerprint;
use crate::core::HashError;
use crate::core::OperationName;
use crate::core::Outcome;
use crate::core::ParameterName;
use crate::core::TestCaseId;
use crate::core::fingerprint;

// ============================================================================
// SECTION: Categories
// ============================================================================

/// Test categories in synthesis order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCategory {
    /// Required parameters valid, nothing optional.
    Smoke,
    /// One optional parameter at an alternate valid value.
    Variation,
    /// One required parameter omitted.
    MissingRequired,
    /// One parameter outside its domain.
    InvalidValue,
    /// Operation name absent from the registry.
    UnknownOperation,
    /// Empty, oversized, or special-character string values.
    EdgeCase,
    /// Ambient dry-run flag enabled.
    DryRun,
    /// Budget below the expected minimum duration.
    Timeout,
}

impl TestCategory {
    /// Every category, in synthesis order.
    pub const ALL: [Self; 8] = [
        Self::Smoke,
        Self::Variation,
        Self::MissingRequired,
        Self::InvalidValue,
        Self::UnknownOperation,
        Self::EdgeCase,
        Self::DryRun,
        Self::Timeout,
    ];

    /// Returns the stable snake-case label used in identifiers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Smoke => "smoke",
            Self::Variation => "variation",
            Self::MissingRequired => "missing_required",
            Self::InvalidValue => "invalid_value",
            Self::UnknownOperation => "unknown_operation",
            Self::EdgeCase => "edge_case",
            Self::DryRun => "dry_run",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Test Cases
// ============================================================================

/// One synthesized test case.
///
/// # Invariants
/// - Immutable after synthesis.
/// - `operation` names a registered descriptor; for
///   [`TestCategory::UnknownOperation`] the invoked name deliberately does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    /// Stable identifier.
    id: TestCaseId,
    /// Descriptor that produced the case.
    operation: OperationName,
    /// Case category.
    category: TestCategory,
    /// Parameter the case targets, when category-specific.
    #[serde(skip_serializing_if = "Option::is_none")]
    parameter: Option<ParameterName>,
    /// Arguments passed after the console executable.
    argv: Vec<String>,
    /// Ambient overrides applied for the duration of the case.
    ambient: AmbientOverrides,
    /// Case-specific timeout budget in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_budget_ms: Option<u64>,
    /// Expected classification.
    expected: Outcome,
    /// Human-readable description.
    description: String,
}

/// Field bundle for constructing a [`TestCase`] inside the crate.
pub(crate) struct TestCaseParts {
    /// Stable identifier.
    pub(crate) id: TestCaseId,
    /// Descriptor that produced the case.
    pub(crate) operation: OperationName,
    /// Case category.
    pub(crate) category: TestCategory,
    /// Targeted parameter.
    pub(crate) parameter: Option<ParameterName>,
    /// Arguments after the console executable.
    pub(crate) argv: Vec<String>,
    /// Ambient overrides.
    pub(crate) ambient: AmbientOverrides,
    /// Timeout budget in milliseconds.
    pub(crate) timeout_budget_ms: Option<u64>,
    /// Expected classification.
    pub(crate) expected: Outcome,
    /// Description.
    pub(crate) description: String,
}

impl TestCase {
    /// Builds a case from its parts.
    pub(crate) fn from_parts(parts: TestCaseParts) -> Self {
        Self {
            id: parts.id,
            operation: parts.operation,
            category: parts.category,
            parameter: parts.parameter,
            argv: parts.argv,
            ambient: parts.ambient,
            timeout_budget_ms: parts.timeout_budget_ms,
            expected: parts.expected,
            description: parts.description,
        }
    }

    /// Returns the case identifier.
    #[must_use]
    pub const fn id(&self) -> &TestCaseId {
        &self.id
    }

    /// Returns the descriptor that produced the case.
    #[must_use]
    pub const fn operation(&self) -> &OperationName {
        &self.operation
    }

    /// Returns the case category.
    #[must_use]
    pub const fn category(&self) -> TestCategory {
        self.category
    }

    /// Returns the parameter the case targets.
    #[must_use]
    pub const fn parameter(&self) -> Option<&ParameterName> {
        self.parameter.as_ref()
    }

    /// Returns the arguments passed after the console executable.
    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Returns the ambient overrides.
    #[must_use]
    pub const fn ambient(&self) -> &AmbientOverrides {
        &self.ambient
    }

    /// Returns the case-specific timeout budget in milliseconds.
    #[must_use]
    pub const fn timeout_budget_ms(&self) -> Option<u64> {
        self.timeout_budget_ms
    }

    /// Returns the expected outcome.
    #[must_use]
    pub const fn expected(&self) -> Outcome {
        self.expected
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns true when the case invokes its own registered operation.
    #[must_use]
    pub fn targets_registered_operation(&self) -> bool {
        self.category != TestCategory::UnknownOperation
    }
}

// ============================================================================
// SECTION: Test Matrix
// ============================================================================

/// Ordered test cases synthesized for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestMatrix {
    /// Operation the matrix covers.
    operation: OperationName,
    /// Cases in synthesis order.
    cases: Vec<TestCase>,
}

impl TestMatrix {
    /// Builds a matrix.
    pub(crate) const fn new(operation: OperationName, cases: Vec<TestCase>) -> Self {
        Self {
            operation,
            cases,
        }
    }

    /// Returns the covered operation.
    #[must_use]
    pub const fn operation(&self) -> &OperationName {
        &self.operation
    }

    /// Returns the cases in synthesis order.
    #[must_use]
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Returns the number of cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Returns true when the matrix has no cases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Returns the cases of one category, in order.
    pub fn in_category(&self, category: TestCategory) -> impl Iterator<Item = &TestCase> {
        self.cases.iter().filter(move |case| case.category == category)
    }

    /// Returns the matrix fingerprint for cross-version diffing.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonical serialization fails.
    pub fn fingerprint(&self) -> Result<Fingerprint, HashError> {
        fingerprint(self)
    }
}
