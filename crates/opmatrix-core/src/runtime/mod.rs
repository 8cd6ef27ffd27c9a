// crates/opmatrix-core/src/runtime/mod.rs
// ============================================================================
// Module: opmatrix Runtime
// Description: Registry, synthesizer, environment scope, and evaluator.
// Purpose: Implement the synchronous halves of the harness pipeline.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules turn registered descriptors into matrices and raw results
//! into verdicts. Process execution lives outside this crate; everything
//! here is synchronous and free of I/O.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod evaluator;
pub mod registry;
pub mod scope;
pub mod synthesizer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use evaluator::AssertionEvaluator;
pub use registry::ConsoleContract;
pub use registry::OperationRegistry;
pub use registry::RegistryError;
pub use scope::EnvironmentScope;
pub use scope::ScopeError;
pub use scope::ScopeGuard;
pub use synthesizer::MatrixSynthesizer;
pub use synthesizer::SynthesisError;
pub use synthesizer::SynthesisOptions;
pub use synthesizer::timeout_budget_ms;
