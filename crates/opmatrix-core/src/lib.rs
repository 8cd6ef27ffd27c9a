// crates/opmatrix-core/src/lib.rs
// ============================================================================
// Module: opmatrix Core Library
// Description: Public API surface for the operation matrix harness core.
// Purpose: Expose descriptor types, interfaces, and the synchronous runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! opmatrix generates and verifies a standard battery of behavioral test
//! cases for every operation a command-line console exposes. This crate
//! holds the declarative descriptor model, the deterministic matrix
//! synthesizer, the ambient environment scope and the verdict evaluator.
//! Invariants:
//! - Descriptors are immutable once registered.
//! - Synthesis is a pure function of the descriptor and options.
//! - Exit-code classification is total per case.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::NoopProbe;
pub use interfaces::ProbeError;
pub use interfaces::ProbeState;
pub use interfaces::SideEffectProbe;
pub use runtime::AssertionEvaluator;
pub use runtime::ConsoleContract;
pub use runtime::EnvironmentScope;
pub use runtime::MatrixSynthesizer;
pub use runtime::OperationRegistry;
pub use runtime::RegistryError;
pub use runtime::ScopeError;
pub use runtime::ScopeGuard;
pub use runtime::SynthesisError;
pub use runtime::SynthesisOptions;
pub use runtime::timeout_budget_ms;
