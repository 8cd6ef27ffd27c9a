// system-tests/src/lib.rs
// ============================================================================
// Module: opmatrix System Tests Library
// Description: Shared settings for the end-to-end suites.
// Purpose: Host the stub console binary alongside suite settings.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! This crate hosts the `service-console-stub` target binary and the shared
//! settings used by the end-to-end suites in `system-tests/tests`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod settings;
