// crates/opmatrix-config/src/config.rs
// ============================================================================
// Module: opmatrix Harness Configuration
// Description: Configuration loading and validation for the harness.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: opmatrix-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path
//! limits. It names the console executable, the console-wide conventions,
//! ambient defaults, execution limits and every operation descriptor.
//! Missing or invalid configuration fails closed; descriptors are validated
//! by building the registry they will populate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use opmatrix_core::ConsoleContract;
use opmatrix_core::OperationDescriptor;
use opmatrix_core::OperationName;
use opmatrix_core::OperationRegistry;
use opmatrix_core::ParameterSource;
use opmatrix_core::SynthesisOptions;
use opmatrix_core::runtime::synthesizer::DEFAULT_DRY_RUN_KEY;
use opmatrix_core::runtime::synthesizer::DEFAULT_EDGE_MAX_LEN;
use opmatrix_core::runtime::synthesizer::DEFAULT_RUN_SUBCOMMAND;
use opmatrix_core::runtime::synthesizer::DEFAULT_TIMEOUT_KEY;
use serde::Deserialize;
use thiserror::Error;

use crate::env::HarnessEnv;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "opmatrix.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "OPMATRIX_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default per-case timeout in milliseconds.
pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 120_000;
/// Maximum per-case timeout in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 3_600_000;
/// Maximum length of the oversized edge-case value.
///
/// One below Linux `MAX_ARG_STRLEN`; longer argv values fail to spawn.
pub const MAX_EDGE_MAX_LEN: usize = 128 * 1024 - 1;
/// Default number of operations run concurrently.
const DEFAULT_MAX_PARALLEL_OPERATIONS: usize = 4;
/// Maximum number of operations run concurrently.
const MAX_PARALLEL_OPERATIONS: usize = 64;

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Harness configuration loaded from `opmatrix.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Target console settings.
    pub console: ConsoleConfig,
    /// Ambient configuration conventions and base values.
    #[serde(default)]
    pub ambient: AmbientConfig,
    /// Execution limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Operation descriptors in registration order.
    #[serde(default)]
    pub operations: Vec<OperationDescriptor>,
}

impl HarnessConfig {
    /// Loads configuration from disk using the default resolution rules and
    /// applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.apply_env(&HarnessEnv::load()?);
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates configuration text without consulting the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides on top of file values.
    pub fn apply_env(&mut self, env: &HarnessEnv) {
        if let Some(binary) = &env.console_bin {
            self.console.binary.clone_from(binary);
        }
        if let Some(timeout_ms) = env.timeout_ms {
            self.limits.default_timeout_ms = timeout_ms;
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.console.validate()?;
        self.ambient.validate()?;
        self.limits.validate()?;
        if self.operations.is_empty() {
            return Err(ConfigError::Invalid("at least one operation must be declared".to_string()));
        }
        for descriptor in &self.operations {
            self.ensure_ambient_parameters_free(descriptor)?;
        }
        self.registry()?;
        Ok(())
    }

    /// Rejects ambient parameters that shadow the harness-owned keys.
    fn ensure_ambient_parameters_free(
        &self,
        descriptor: &OperationDescriptor,
    ) -> Result<(), ConfigError> {
        let reserved = [&self.ambient.dry_run_key, &self.ambient.timeout_key];
        for parameter in &descriptor.parameters {
            if parameter.source == ParameterSource::Ambient
                && reserved.iter().any(|key| key.as_str() == parameter.name.as_str())
            {
                return Err(ConfigError::Invalid(format!(
                    "operations.{}: ambient parameter {} shadows a harness ambient key",
                    descriptor.name, parameter.name
                )));
            }
        }
        Ok(())
    }

    /// Returns the console-wide contract.
    #[must_use]
    pub fn console_contract(&self) -> ConsoleContract {
        ConsoleContract {
            unknown_operation_name: OperationName::new(&self.console.unknown_operation_name),
            unknown_operation_exit_code: self.console.unknown_operation_exit_code,
        }
    }

    /// Builds the operation registry from the declared descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a descriptor fails registration.
    pub fn registry(&self) -> Result<OperationRegistry, ConfigError> {
        let mut registry = OperationRegistry::new(self.console_contract())
            .map_err(|err| ConfigError::Invalid(format!("console: {err}")))?;
        for descriptor in &self.operations {
            registry
                .register(descriptor.clone())
                .map_err(|err| ConfigError::Invalid(format!("operations: {err}")))?;
        }
        Ok(registry)
    }

    /// Returns the synthesis options implied by the configuration.
    #[must_use]
    pub fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            run_subcommand: self.console.run_subcommand.clone(),
            dry_run_key: self.ambient.dry_run_key.clone(),
            timeout_key: self.ambient.timeout_key.clone(),
            unknown_operation_name: OperationName::new(&self.console.unknown_operation_name),
            edge_max_len: self.limits.edge_max_len,
        }
    }

    /// Returns the timeout applied to cases without their own budget.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.limits.default_timeout_ms)
    }
}

/// Target console settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Console executable path or name.
    pub binary: PathBuf,
    /// Subcommand placed before the operation name.
    #[serde(default = "default_run_subcommand")]
    pub run_subcommand: String,
    /// Name used to probe unknown-operation handling.
    #[serde(default = "default_unknown_operation_name")]
    pub unknown_operation_name: String,
    /// Exit code the console reports for unknown operations.
    #[serde(default = "default_unknown_operation_exit_code")]
    pub unknown_operation_exit_code: i32,
}

impl ConsoleConfig {
    /// Validates console settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("console.binary", &self.binary.to_string_lossy())?;
        validate_token("console.run_subcommand", &self.run_subcommand)?;
        validate_token("console.unknown_operation_name", &self.unknown_operation_name)?;
        Ok(())
    }
}

/// Ambient configuration conventions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AmbientConfig {
    /// Key that enables dry-run mode.
    #[serde(default = "default_dry_run_key")]
    pub dry_run_key: String,
    /// Key that publishes the timeout budget.
    #[serde(default = "default_timeout_key")]
    pub timeout_key: String,
    /// Values present for every case unless a case overrides them.
    #[serde(default)]
    pub base: BTreeMap<String, String>,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            dry_run_key: default_dry_run_key(),
            timeout_key: default_timeout_key(),
            base: BTreeMap::new(),
        }
    }
}

impl AmbientConfig {
    /// Validates ambient settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_ambient_key("ambient.dry_run_key", &self.dry_run_key)?;
        validate_ambient_key("ambient.timeout_key", &self.timeout_key)?;
        if self.dry_run_key == self.timeout_key {
            return Err(ConfigError::Invalid(
                "ambient.dry_run_key and ambient.timeout_key must differ".to_string(),
            ));
        }
        for (key, value) in &self.base {
            validate_ambient_key("ambient.base", key)?;
            if key == &self.dry_run_key || key == &self.timeout_key {
                return Err(ConfigError::Invalid(format!(
                    "ambient.base.{key} shadows a harness ambient key"
                )));
            }
            if value.contains('\0') {
                return Err(ConfigError::Invalid(format!("ambient.base.{key} contains NUL")));
            }
        }
        Ok(())
    }
}

/// Execution limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Timeout for cases without their own budget, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Length of the oversized edge-case value.
    #[serde(default = "default_edge_max_len")]
    pub edge_max_len: usize,
    /// Operations run concurrently.
    #[serde(default = "default_max_parallel_operations")]
    pub max_parallel_operations: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            edge_max_len: default_edge_max_len(),
            max_parallel_operations: default_max_parallel_operations(),
        }
    }
}

impl LimitsConfig {
    /// Validates limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_TIMEOUT_MS).contains(&self.default_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "limits.default_timeout_ms must be between 1 and {MAX_TIMEOUT_MS}"
            )));
        }
        if !(1..=MAX_EDGE_MAX_LEN).contains(&self.edge_max_len) {
            return Err(ConfigError::Invalid(format!(
                "limits.edge_max_len must be between 1 and {MAX_EDGE_MAX_LEN}"
            )));
        }
        if !(1..=MAX_PARALLEL_OPERATIONS).contains(&self.max_parallel_operations) {
            return Err(ConfigError::Invalid(format!(
                "limits.max_parallel_operations must be between 1 and {MAX_PARALLEL_OPERATIONS}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit path, the env override, or the default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Some(env_path) = crate::env::read_env_strict(CONFIG_ENV_VAR)? {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a single command-line token.
fn validate_token(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty without whitespace")));
    }
    Ok(())
}

/// Validates an ambient key usable as an environment variable name.
fn validate_ambient_key(field: &str, key: &str) -> Result<(), ConfigError> {
    if key.is_empty() || key.contains(['=', '\0']) {
        return Err(ConfigError::Invalid(format!(
            "{field}: ambient key {key:?} must be non-empty without '=' or NUL"
        )));
    }
    Ok(())
}

/// Default for `console.run_subcommand`.
fn default_run_subcommand() -> String {
    DEFAULT_RUN_SUBCOMMAND.to_string()
}

/// Default for `console.unknown_operation_name`.
fn default_unknown_operation_name() -> String {
    ConsoleContract::default().unknown_operation_name.to_string()
}

/// Default for `console.unknown_operation_exit_code`.
fn default_unknown_operation_exit_code() -> i32 {
    ConsoleContract::default().unknown_operation_exit_code
}

/// Default for `ambient.dry_run_key`.
fn default_dry_run_key() -> String {
    DEFAULT_DRY_RUN_KEY.to_string()
}

/// Default for `ambient.timeout_key`.
fn default_timeout_key() -> String {
    DEFAULT_TIMEOUT_KEY.to_string()
}

/// Default for `limits.default_timeout_ms`.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default for `limits.edge_max_len`.
const fn default_edge_max_len() -> usize {
    DEFAULT_EDGE_MAX_LEN
}

/// Default for `limits.max_parallel_operations`.
const fn default_max_parallel_operations() -> usize {
    DEFAULT_MAX_PARALLEL_OPERATIONS
}

// ============================================================================
// SECTION: Tests
// ============================================================================
