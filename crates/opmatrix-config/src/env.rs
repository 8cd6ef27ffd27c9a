// crates/opmatrix-config/src/env.rs
// ============================================================================
// Module: opmatrix Environment Overrides
// Description: Environment-backed overrides for harness configuration.
// Purpose: Let deployments point at a console binary and budget without editing TOML.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid
//! silent misconfiguration. Invalid UTF-8, empty values and non-positive
//! timeouts fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::config::MAX_TIMEOUT_MS;
use crate::config::MAX_TOTAL_PATH_LENGTH;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys for harness configuration overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnvVar {
    /// Console executable override.
    ConsoleBin,
    /// Default per-case timeout override in milliseconds (positive integer).
    TimeoutMs,
}

impl HarnessEnvVar {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConsoleBin => "OPMATRIX_CONSOLE_BIN",
            Self::TimeoutMs => "OPMATRIX_TIMEOUT_MS",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed overrides derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarnessEnv {
    /// Console executable override.
    pub console_bin: Option<PathBuf>,
    /// Default per-case timeout override in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl HarnessEnv {
    /// Loads overrides from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is not valid UTF-8, is
    /// empty, or fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let console_bin = read_env_nonempty(HarnessEnvVar::ConsoleBin.as_str())?;
        if let Some(path) = &console_bin
            && path.len() > MAX_TOTAL_PATH_LENGTH
        {
            return Err(ConfigError::Invalid(format!(
                "{} exceeds max length",
                HarnessEnvVar::ConsoleBin.as_str()
            )));
        }
        let timeout_ms = read_env_nonempty(HarnessEnvVar::TimeoutMs.as_str())?
            .map(|value| parse_timeout_ms(HarnessEnvVar::TimeoutMs.as_str(), &value))
            .transpose()?;
        Ok(Self {
            console_bin: console_bin.map(PathBuf::from),
            timeout_ms,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[path = "env_tests.rs"]
mod env_tests;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} must be valid UTF-8")))
    })
}

/// Reads an environment variable and rejects empty values.
fn read_env_nonempty(name: &str) -> Result<Option<String>, ConfigError> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => {
            Err(ConfigError::Invalid(format!("{name} must not be empty")))
        }
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a positive millisecond timeout within the configured bound.
pub(crate) fn parse_timeout_ms(name: &str, raw: &str) -> Result<u64, ConfigError> {
    let invalid = || {
        ConfigError::Invalid(format!(
            "{name} must be a positive integer number of milliseconds up to {MAX_TIMEOUT_MS}"
        ))
    };
    let millis: u64 = raw.trim().parse().map_err(|_| invalid())?;
    if millis == 0 || millis > MAX_TIMEOUT_MS {
        return Err(invalid());
    }
    Ok(millis)
}
