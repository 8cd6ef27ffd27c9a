// system-tests/src/settings.rs
// ============================================================================
// Module: Suite Settings
// Description: Environment-driven knobs for the end-to-end suites.
// Purpose: Let CI relocate run roots and stretch case timeouts without edits.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Two variables tune the suites:
//!
//! - `OPMATRIX_SYSTEM_TEST_RUN_ROOT`: parent directory for per-test run roots.
//! - `OPMATRIX_SYSTEM_TEST_TIMEOUT_SEC`: lower bound for per-case timeouts.
//!
//! Values must be valid UTF-8 and non-empty; anything else is an error rather
//! than a silently ignored setting.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Parent directory for run roots.
pub const RUN_ROOT_ENV: &str = "OPMATRIX_SYSTEM_TEST_RUN_ROOT";
/// Minimum per-case timeout in whole seconds.
pub const TIMEOUT_ENV: &str = "OPMATRIX_SYSTEM_TEST_TIMEOUT_SEC";

/// Rejected suite settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// The variable is not valid UTF-8.
    #[error("{0} must be valid UTF-8")]
    NotUnicode(&'static str),
    /// The variable is set but blank.
    #[error("{0} must not be empty")]
    Empty(&'static str),
    /// The timeout is not a positive number of seconds.
    #[error("{0} must be a positive integer number of seconds, got {1:?}")]
    Timeout(&'static str, String),
}

/// Settings shared by the suite helpers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteSettings {
    /// Parent directory for run roots; the system temp dir when unset.
    pub run_root: Option<PathBuf>,
    /// Lower bound applied to per-case timeouts.
    pub min_timeout: Option<Duration>,
}

impl SuiteSettings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when a variable is malformed.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Reads settings through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when a variable is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self, SettingsError> {
        let run_root = text(&lookup, RUN_ROOT_ENV)?.map(PathBuf::from);
        let min_timeout = match text(&lookup, TIMEOUT_ENV)? {
            Some(raw) => Some(seconds(&raw)?),
            None => None,
        };
        Ok(Self {
            run_root,
            min_timeout,
        })
    }

    /// Stretches a requested timeout to the configured minimum.
    #[must_use]
    pub fn timeout_for(&self, requested: Duration) -> Duration {
        self.min_timeout.map_or(requested, |floor| requested.max(floor))
    }
}

/// Returns a non-blank UTF-8 variable value.
fn text(
    lookup: &impl Fn(&str) -> Option<OsString>,
    key: &'static str,
) -> Result<Option<String>, SettingsError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let value = raw.into_string().map_err(|_| SettingsError::NotUnicode(key))?;
    if value.trim().is_empty() {
        return Err(SettingsError::Empty(key));
    }
    Ok(Some(value))
}

/// Parses a positive number of seconds.
fn seconds(raw: &str) -> Result<Duration, SettingsError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(SettingsError::Timeout(TIMEOUT_ENV, raw.to_string())),
    }
}
