// crates/opmatrix-runner/src/cancel.rs
// ============================================================================
// Module: opmatrix Suite Cancellation
// Description: Suite-wide cancellation signal.
// Purpose: Stop in-flight invocations and skip remaining cases on request.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! A [`CancelHandle`] owns a `tokio::sync::watch` channel. Every invoker
//! holds a [`CancelToken`] and races its child process against it.
//! Cancellation is sticky: once set it is never cleared.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::watch;

// ============================================================================
// SECTION: Handle
// ============================================================================

/// Sender side of the suite cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    /// Shared sender.
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    /// Creates an uncancelled handle.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Cancels the suite.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Returns true once the suite is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Returns a token observing this handle.
    #[must_use]
    pub fn token(&self) -> CancelToken {
        CancelToken {
            receiver: self.sender.subscribe(),
        }
    }
}

// ============================================================================
// SECTION: Token
// ============================================================================

/// Receiver side of the suite cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    /// Watch receiver.
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    /// Returns a token that is never cancelled.
    #[must_use]
    pub fn never() -> Self {
        CancelHandle::new().token()
    }

    /// Returns true once the suite is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves when the suite is cancelled; pends forever if the handle is gone.
    pub async fn cancelled(&mut self) {
        if self.receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
