// crates/opmatrix-core/src/core/mod.rs
// ============================================================================
// Module: opmatrix Core Types
// Description: Data model shared by the registry, synthesizer, and evaluator.
// Purpose: Group identifiers, descriptors, matrices, and outcomes.
// Dependencies: crate::core::*
// ============================================================================

//! ## Overview
//! Plain data types with validation; no I/O and no shared mutable state.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod ambient;
pub mod descriptor;
pub mod drift;
pub mod hashing;
pub mod identifiers;
pub mod matrix;
pub mod outcome;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use ambient::*;
pub use descriptor::*;
pub use drift::*;
pub use hashing::Fingerprint;
pub use hashing::HashError;
pub use hashing::fingerprint;
pub use identifiers::*;
pub use matrix::TestCase;
pub use matrix::TestCategory;
pub use matrix::TestMatrix;
pub(crate) use matrix::TestCaseParts;
pub use outcome::*;
