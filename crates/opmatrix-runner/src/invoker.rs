// crates/opmatrix-runner/src/invoker.rs
// ============================================================================
// Module: opmatrix Invoker
// Description: Runs the target console as an isolated child process.
// Purpose: Capture exit code and output under a timeout budget.
// Dependencies: tokio, tracing, opmatrix-core
// ============================================================================

//! ## Overview
//! Each invocation spawns `<console> <argv...>` with a null stdin, piped
//! output and the ambient snapshot layered onto the child environment.
//! Managed keys absent from the snapshot are removed from the child, so a
//! value exported in the harness shell never stands in for an unset one.
//! The child races its budget and the suite cancellation token: on budget
//! expiry it is killed and reported as timed out with
//! [`opmatrix_core::TIMEOUT_EXIT_CODE`]; on cancellation it is killed and
//! [`InvokeError::Cancelled`] is returned. Non-zero exits are ordinary
//! results. `kill_on_drop` guarantees the child dies with a dropped future.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;

use opmatrix_core::AmbientState;
use opmatrix_core::ExecutionResult;
use opmatrix_core::HarnessFault;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

use crate::cancel::CancelToken;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Time allowed to drain output pipes after the child is gone.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(2);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Invocation failures that prevent an execution result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    /// The console executable could not be started.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Program path.
        program: String,
        /// Operating system error.
        message: String,
    },
    /// Waiting on or killing the child failed.
    #[error("child process io error: {0}")]
    Io(String),
    /// The suite was cancelled while the child was running.
    #[error("cancelled")]
    Cancelled,
}

impl InvokeError {
    /// Returns the harness fault reported in the case verdict.
    #[must_use]
    pub fn fault(&self) -> HarnessFault {
        HarnessFault::Execution(self.to_string())
    }
}

// ============================================================================
// SECTION: Invoker
// ============================================================================

/// Spawns the console executable for test cases.
#[derive(Debug, Clone)]
pub struct Invoker {
    /// Console executable.
    program: PathBuf,
    /// Budget for cases without their own.
    default_timeout: Duration,
    /// Suite cancellation token.
    cancel: CancelToken,
    /// Ambient keys the child only sees through the snapshot.
    managed: BTreeSet<String>,
}

/// How the wait on the child ended.
enum Waited {
    /// The child exited on its own.
    Exited(std::io::Result<ExitStatus>),
    /// The budget elapsed first.
    TimedOut,
    /// The suite was cancelled first.
    Cancelled,
}

impl Invoker {
    /// Creates an invoker that is never cancelled.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, default_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            default_timeout,
            cancel: CancelToken::never(),
            managed: BTreeSet::new(),
        }
    }

    /// Attaches a suite cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Declares ambient keys that must never leak in from the harness
    /// environment. A managed key reaches the child only when the snapshot
    /// carries it.
    #[must_use]
    pub fn with_managed_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.managed.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Returns the console executable.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Runs the console once.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::Spawn`] when the process cannot start,
    /// [`InvokeError::Io`] when waiting or killing fails, and
    /// [`InvokeError::Cancelled`] when the suite is cancelled mid-run.
    pub async fn invoke(
        &self,
        argv: &[String],
        ambient: &AmbientState,
        budget: Option<Duration>,
    ) -> Result<ExecutionResult, InvokeError> {
        let budget = budget.unwrap_or(self.default_timeout);
        let mut cancel = self.cancel.clone();
        if cancel.is_cancelled() {
            return Err(InvokeError::Cancelled);
        }

        let mut command = Command::new(&self.program);
        command.args(argv);
        for key in self.managed.iter().filter(|key| !ambient.contains_key(*key)) {
            command.env_remove(key);
        }
        command.envs(ambient);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command.kill_on_drop(true);

        let started = Instant::now();
        let mut child = command.spawn().map_err(|err| InvokeError::Spawn {
            program: self.program.display().to_string(),
            message: err.to_string(),
        })?;
        debug!(
            program = %self.program.display(),
            argv = %argv.join(" "),
            budget_ms = budget.as_millis(),
            "spawned console"
        );
        let stdout = tokio::spawn(read_stream(child.stdout.take()));
        let stderr = tokio::spawn(read_stream(child.stderr.take()));

        let waited = tokio::select! {
            status = child.wait() => Waited::Exited(status),
            () = tokio::time::sleep(budget) => Waited::TimedOut,
            () = cancel.cancelled() => Waited::Cancelled,
        };

        match waited {
            Waited::Exited(status) => {
                let status = status.map_err(|err| InvokeError::Io(err.to_string()))?;
                let elapsed = started.elapsed();
                let stdout = collect(stdout).await;
                let stderr = collect(stderr).await;
                if status.code().is_none() {
                    warn!(program = %self.program.display(), "console terminated by signal");
                }
                Ok(ExecutionResult::exited(status.code(), stdout, stderr, elapsed))
            }
            Waited::TimedOut => {
                child.kill().await.map_err(|err| InvokeError::Io(err.to_string()))?;
                let elapsed = started.elapsed();
                debug!(budget_ms = budget.as_millis(), "console exceeded budget; killed");
                let stdout = collect(stdout).await;
                let stderr = collect(stderr).await;
                Ok(ExecutionResult::timed_out(stdout, stderr, elapsed))
            }
            Waited::Cancelled => {
                child.kill().await.map_err(|err| InvokeError::Io(err.to_string()))?;
                stdout.abort();
                stderr.abort();
                debug!("suite cancelled; console killed");
                Err(InvokeError::Cancelled)
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a child pipe to its end.
async fn read_stream<R>(stream: Option<R>) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    if let Some(mut stream) = stream
        && stream.read_to_end(&mut buffer).await.is_err()
    {
        buffer.clear();
    }
    buffer
}

/// Waits briefly for a pipe reader and decodes its bytes lossily.
///
/// Grandchildren that inherited the pipe can keep it open after the child
/// dies, so the read is bounded.
async fn collect(handle: JoinHandle<Vec<u8>>) -> String {
    let abort = handle.abort_handle();
    match tokio::time::timeout(OUTPUT_DRAIN_GRACE, handle).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        Ok(Err(_)) => String::new(),
        Err(_) => {
            abort.abort();
            String::new()
        }
    }
}
