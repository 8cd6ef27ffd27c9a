// crates/opmatrix-core/src/core/drift.rs
// ============================================================================
// Module: opmatrix Matrix Drift
// Description: Comparison of matrix fingerprints against a recorded baseline.
// Purpose: Report which operations gained, lost, or changed synthesized cases.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! A baseline is the set of per-operation fingerprints recorded by an
//! earlier harness build. Comparing it with the current set yields one
//! [`MatrixDrift`] per operation whose matrix differs, in operation order.
//! Operations with identical fingerprints produce nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::Fingerprint;
use crate::core::OperationName;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Matrix fingerprints keyed by operation.
pub type FingerprintSet = BTreeMap<OperationName, Fingerprint>;

/// How an operation's matrix differs from the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    /// Present now, absent from the baseline.
    Added,
    /// Present in the baseline, absent now.
    Removed,
    /// Present in both with different fingerprints.
    Changed,
}

/// One operation whose matrix drifted from the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixDrift {
    /// Operation the matrix belongs to.
    pub operation: OperationName,
    /// Kind of drift.
    pub drift: DriftKind,
    /// Baseline fingerprint, when the baseline had the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<Fingerprint>,
    /// Current fingerprint, when the operation still exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Fingerprint>,
}

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Compares current fingerprints with a baseline.
#[must_use]
pub fn compare_fingerprints(
    baseline: &FingerprintSet,
    current: &FingerprintSet,
) -> Vec<MatrixDrift> {
    let mut operations: Vec<&OperationName> = baseline.keys().chain(current.keys()).collect();
    operations.sort();
    operations.dedup();
    operations
        .into_iter()
        .filter_map(|operation| {
            let before = baseline.get(operation);
            let after = current.get(operation);
            let drift = match (before, after) {
                (None, Some(_)) => DriftKind::Added,
                (Some(_), None) => DriftKind::Removed,
                (Some(before), Some(after)) if before != after => DriftKind::Changed,
                _ => return None,
            };
            Some(MatrixDrift {
                operation: operation.clone(),
                drift,
                baseline: before.cloned(),
                current: after.cloned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(entries: &[(&str, &str)]) -> FingerprintSet {
        entries
            .iter()
            .map(|(name, body)| (OperationName::new(*name), Fingerprint::of_bytes(body.as_bytes())))
            .collect()
    }

    #[test]
    fn identical_sets_do_not_drift() {
        let baseline = set(&[("Health_Check", "a"), ("Upgrade", "b")]);
        assert!(compare_fingerprints(&baseline, &baseline).is_empty());
    }

    #[test]
    fn drift_is_reported_in_operation_order() {
        let baseline = set(&[("Upgrade", "old"), ("Decommission", "d"), ("Health_Check", "h")]);
        let current = set(&[("Upgrade", "new"), ("Node_Replacement", "n"), ("Health_Check", "h")]);
        let drift = compare_fingerprints(&baseline, &current);
        let summary: Vec<(&str, DriftKind)> =
            drift.iter().map(|entry| (entry.operation.as_str(), entry.drift)).collect();
        assert_eq!(
            summary,
            vec![
                ("Decommission", DriftKind::Removed),
                ("Node_Replacement", DriftKind::Added),
                ("Upgrade", DriftKind::Changed),
            ]
        );
        assert_eq!(drift[0].current, None);
        assert_eq!(drift[1].baseline, None);
        assert_eq!(drift[2].baseline, Some(Fingerprint::of_bytes(b"old")));
        assert_eq!(drift[2].current, Some(Fingerprint::of_bytes(b"new")));
    }
}
