// crates/opmatrix-core/src/core/ambient.rs
// ============================================================================
// Module: opmatrix Ambient Configuration
// Description: Key/value types for configuration supplied out-of-band.
// Purpose: Describe ambient state and the overrides a test case layers on it.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Ambient configuration (dry-run flag, timeout budget, operation
//! identifiers) travels as named string values. The target console reads it
//! from its process environment; the harness only ever mutates it through
//! [`crate::runtime::EnvironmentScope`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Complete ambient state, ordered by key.
pub type AmbientState = BTreeMap<String, String>;

/// Overrides a test case applies on top of the ambient state.
pub type AmbientOverrides = BTreeMap<String, AmbientValue>;

/// Override applied to a single ambient key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbientValue {
    /// Set the key to this value.
    Set(String),
    /// Remove the key for the duration of the scope.
    Unset,
}

impl AmbientValue {
    /// Creates a `Set` override.
    #[must_use]
    pub fn set(value: impl Into<String>) -> Self {
        Self::Set(value.into())
    }
}
