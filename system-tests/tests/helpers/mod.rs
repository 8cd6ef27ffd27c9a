// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for opmatrix system-tests.
// Purpose: Provide the stub console harness and CLI resolution.
// Dependencies: system-tests, opmatrix-config, opmatrix-runner
// ============================================================================

//! ## Overview
//! Shared helpers for opmatrix system-tests. Every suite drives the
//! `service-console-stub` binary built by this crate.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod cli;
pub mod harness;
