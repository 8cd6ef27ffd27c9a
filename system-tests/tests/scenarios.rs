// system-tests/tests/scenarios.rs
// ============================================================================
// Module: Scenario Suite
// Description: Aggregates console scenario system tests into one binary.
// Purpose: Drive the stub console through the documented end-to-end scenarios.
// Dependencies: suites/*, helpers
// ============================================================================

//! ## Overview
//! Aggregates console scenario system tests into one binary.
//! Purpose: Drive the stub console through the documented end-to-end scenarios.
//! Invariants:
//! - Every run uses an isolated state directory under a temporary run root.
//! - The stub console is the only process the suites drive directly.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod helpers;

#[path = "suites/scenarios.rs"]
mod scenarios;
