// crates/opmatrix-core/src/runtime/scope.rs
// ============================================================================
// Module: opmatrix Environment Scope
// Description: Shared ambient state with scoped, exactly-restored overrides.
// Purpose: Apply per-case ambient overrides and revert them on every exit path.
// Dependencies: thiserror, crate::core
// ============================================================================

//! ## Overview
//! An [`EnvironmentScope`] owns the ambient key/value state for one
//! operation's test cases. [`EnvironmentScope::enter`] validates every key,
//! then applies all overrides under a single lock and returns a
//! [`ScopeGuard`]. Dropping the guard restores each touched key to its prior
//! value, so restoration happens on normal exit, on early return, during
//! panic unwinding and when an enclosing future is dropped.
//!
//! Two live guards may never touch the same key; the second `enter` fails
//! with [`ScopeError::Overlap`]. The harness process environment is never
//! modified: [`EnvironmentScope::snapshot`] is handed to the invoker, which
//! applies it to the child process only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use thiserror::Error;

use crate::core::AmbientOverrides;
use crate::core::AmbientState;
use crate::core::AmbientValue;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Environment scope failures; all are harness-internal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// A live scope already holds the key.
    #[error("ambient key {0} is already held by a live scope")]
    Overlap(String),
    /// An override used an empty key.
    #[error("ambient key must not be empty")]
    EmptyKey,
    /// An override key cannot be used as an environment variable name.
    #[error("ambient key {0:?} contains '=' or NUL")]
    InvalidKey(String),
    /// An override value cannot be passed through the environment.
    #[error("ambient value for {0} contains NUL")]
    InvalidValue(String),
    /// The state lock was poisoned by a panicking holder.
    #[error("ambient state lock poisoned")]
    Poisoned,
}

// ============================================================================
// SECTION: Scope
// ============================================================================

/// Ambient state and the keys currently held by live guards.
#[derive(Debug, Default)]
struct ScopeState {
    /// Current ambient values.
    values: AmbientState,
    /// Keys held by live guards.
    held: BTreeSet<String>,
}

/// Shared ambient key/value state.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentScope {
    /// State protected by a mutex.
    state: Arc<Mutex<ScopeState>>,
}

impl EnvironmentScope {
    /// Creates a scope seeded with base ambient values.
    #[must_use]
    pub fn new(base: AmbientState) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScopeState {
                values: base,
                held: BTreeSet::new(),
            })),
        }
    }

    /// Returns a copy of the current ambient state.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Poisoned`] when the state lock is poisoned.
    pub fn snapshot(&self) -> Result<AmbientState, ScopeError> {
        let state = self.state.lock().map_err(|_| ScopeError::Poisoned)?;
        Ok(state.values.clone())
    }

    /// Returns true when no guard is live.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Poisoned`] when the state lock is poisoned.
    pub fn is_idle(&self) -> Result<bool, ScopeError> {
        let state = self.state.lock().map_err(|_| ScopeError::Poisoned)?;
        Ok(state.held.is_empty())
    }

    /// Applies overrides atomically and returns the guard that reverts them.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError`] when a key or value is invalid, a key is held
    /// by another live guard, or the lock is poisoned. Nothing is modified
    /// when an error is returned.
    pub fn enter(&self, overrides: &AmbientOverrides) -> Result<ScopeGuard, ScopeError> {
        for (key, value) in overrides {
            validate_entry(key, value)?;
        }
        let mut state = self.state.lock().map_err(|_| ScopeError::Poisoned)?;
        if let Some(key) = overrides.keys().find(|key| state.held.contains(*key)) {
            return Err(ScopeError::Overlap(key.clone()));
        }
        let mut prior = BTreeMap::new();
        for (key, value) in overrides {
            let previous = match value {
                AmbientValue::Set(value) => state.values.insert(key.clone(), value.clone()),
                AmbientValue::Unset => state.values.remove(key),
            };
            state.held.insert(key.clone());
            prior.insert(key.clone(), previous);
        }
        drop(state);
        Ok(ScopeGuard {
            state: Arc::clone(&self.state),
            prior,
        })
    }
}

/// Checks an override can be represented in a process environment.
fn validate_entry(key: &str, value: &AmbientValue) -> Result<(), ScopeError> {
    if key.is_empty() {
        return Err(ScopeError::EmptyKey);
    }
    if key.contains(['=', '\0']) {
        return Err(ScopeError::InvalidKey(key.to_string()));
    }
    if let AmbientValue::Set(value) = value
        && value.contains('\0')
    {
        return Err(ScopeError::InvalidValue(key.to_string()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Guard
// ============================================================================

/// Live override set; restores prior values when dropped.
#[derive(Debug)]
#[must_use = "overrides are reverted as soon as the guard is dropped"]
pub struct ScopeGuard {
    /// Shared state to restore into.
    state: Arc<Mutex<ScopeState>>,
    /// Values held before entry; `None` means the key was absent.
    prior: BTreeMap<String, Option<String>>,
}

impl ScopeGuard {
    /// Returns the keys this guard holds.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.prior.keys().map(String::as_str)
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        // Restoration must run even after a panic poisoned the lock.
        let mut state: MutexGuard<'_, ScopeState> =
            self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for (key, previous) in std::mem::take(&mut self.prior) {
            match previous {
                Some(value) => {
                    state.values.insert(key.clone(), value);
                }
                None => {
                    state.values.remove(&key);
                }
            }
            state.held.remove(&key);
        }
    }
}
