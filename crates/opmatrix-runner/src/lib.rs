// crates/opmatrix-runner/src/lib.rs
// ============================================================================
// Module: opmatrix Runner
// Description: Executes synthesized test matrices against a console binary.
// Purpose: Spawn, time out, cancel and judge console invocations.
// Dependencies: opmatrix-core, tokio, tracing
// ============================================================================

//! ## Overview
//! The runner turns matrices from `opmatrix-core` into verdicts. The
//! [`Invoker`] owns process spawning and budgets; the [`SuiteRunner`]
//! schedules operations in parallel and cases in order; [`FileProbe`]
//! watches a directory for dry-run side effects.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cancel;
pub mod invoker;
pub mod probe;
pub mod runner;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cancel::CancelHandle;
pub use cancel::CancelToken;
pub use invoker::InvokeError;
pub use invoker::Invoker;
pub use probe::FileProbe;
pub use runner::OperationReport;
pub use runner::RunnerError;
pub use runner::RunnerSettings;
pub use runner::SuiteRunner;
