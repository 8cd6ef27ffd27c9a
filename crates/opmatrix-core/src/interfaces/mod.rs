// crates/opmatrix-core/src/interfaces/mod.rs
// ============================================================================
// Module: opmatrix Interfaces
// Description: Traits supplied by the operation environment.
// Purpose: Let environments verify dry-run side-effect absence without the harness.
// Dependencies: thiserror, crate::core
// ============================================================================

//! ## Overview
//! The harness never inspects what an operation mutates. An environment that
//! can observe mutations implements [`SideEffectProbe`]; the runner observes
//! before and after each dry-run case and fails the case when the
//! observation changed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::OperationName;

// ============================================================================
// SECTION: Side-Effect Probe
// ============================================================================

/// Opaque observation of mutable environment state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeState(String);

impl ProbeState {
    /// Creates an observation from its textual summary.
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self(summary.into())
    }

    /// Returns the textual summary.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Observes the state an operation could mutate.
pub trait SideEffectProbe: Send + Sync {
    /// Captures the current observable state for the operation.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when the state cannot be observed.
    fn observe(&self, operation: &OperationName) -> Result<ProbeState, ProbeError>;
}

/// Probe that observes nothing; every observation is identical.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProbe;

impl SideEffectProbe for NoopProbe {
    fn observe(&self, _operation: &OperationName) -> Result<ProbeState, ProbeError> {
        Ok(ProbeState::new(""))
    }
}

/// Side-effect probe failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The observed resource could not be read.
    #[error("side-effect probe failed: {0}")]
    Observe(String),
}
