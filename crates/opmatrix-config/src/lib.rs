// crates/opmatrix-config/src/lib.rs
// ============================================================================
// Module: opmatrix Config Library
// Description: Harness configuration model and validation.
// Purpose: Single source of truth for opmatrix.toml semantics.
// Dependencies: opmatrix-core, serde, toml
// ============================================================================

//! ## Overview
//! `opmatrix-config` defines the harness configuration model: the target
//! console, ambient conventions, execution limits and the operation
//! descriptors. Validation is strict and fails closed; environment
//! overrides are parsed with strict UTF-8 checks.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::HarnessEnv;
pub use env::HarnessEnvVar;
