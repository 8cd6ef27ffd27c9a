// crates/opmatrix-core/src/core/descriptor.rs
// ============================================================================
// Module: opmatrix Operation Descriptors
// Description: Declarative contract for one console operation.
// Purpose: Model parameters, value domains, exit codes, and capabilities.
// Dependencies: regex, serde, thiserror
// ============================================================================

//! ## Overview
//! An [`OperationDescriptor`] is the single typed schema the synthesizer
//! reads. It declares every parameter with its type, value domain and
//! delivery channel, the operation's exit-code table and its capability
//! flags. [`OperationDescriptor::validate`] enforces the structural rules the
//! synthesizer and evaluator rely on; the registry runs it on registration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ExitCodeTable;
use crate::core::FailureClass;
use crate::core::OperationName;
use crate::core::ParameterName;
use crate::core::TIMEOUT_EXIT_CODE;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fallback valid values for string parameters without examples.
const STRING_FALLBACKS: [&str; 2] = ["test-value", "test-value-alt"];
/// Fallback valid values for integer parameters without examples.
const INTEGER_FALLBACKS: [&str; 2] = ["1", "2"];
/// Value used to violate the implicit numeric domain of integer parameters.
const NOT_A_NUMBER: &str = "not_a_number";
/// Candidates tried, in order, when looking for a value outside a pattern.
const PATTERN_VIOLATIONS: [&str; 4] = ["", " ", "!invalid value!", "\u{1}"];
/// Minimum expected duration for operations that support timeouts.
const MIN_TIMEOUT_DURATION_MS: u64 = 2;

// ============================================================================
// SECTION: Parameter Types
// ============================================================================

/// Value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Free-form or constrained text.
    #[default]
    String,
    /// Signed 64-bit integer.
    Integer,
    /// Boolean switch passed as a bare flag.
    Flag,
}

/// Channel through which a parameter reaches the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSource {
    /// Command-line flag (`--name value`).
    #[default]
    Flag,
    /// Ambient key named after the parameter.
    Ambient,
}

/// Declared set of valid values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueDomain {
    /// Inclusive integer range.
    Range {
        /// Smallest accepted value.
        min: i64,
        /// Largest accepted value.
        max: i64,
    },
    /// Regular expression the whole value must match.
    Pattern {
        /// Unanchored pattern source; matching is anchored at both ends.
        regex: String,
    },
    /// Closed set of accepted values.
    OneOf {
        /// Accepted values.
        values: Vec<String>,
    },
}

impl ValueDomain {
    /// Returns true when the value lies inside the domain.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::Range {
                min,
                max,
            } => value.parse::<i64>().is_ok_and(|parsed| (*min..=*max).contains(&parsed)),
            Self::Pattern {
                regex,
            } => anchored(regex).is_ok_and(|compiled| compiled.is_match(value)),
            Self::OneOf {
                values,
            } => values.iter().any(|candidate| candidate == value),
        }
    }

    /// Returns valid values derived from the domain itself.
    fn samples(&self) -> Vec<String> {
        match self {
            Self::Range {
                min,
                max,
            } => vec![min.to_string(), max.to_string()],
            Self::Pattern {
                ..
            } => Vec::new(),
            Self::OneOf {
                values,
            } => values.clone(),
        }
    }

    /// Returns a deterministic value outside the domain, if one exists.
    #[must_use]
    pub fn outside_value(&self) -> Option<String> {
        match self {
            Self::Range {
                min,
                max,
            } => max
                .checked_add(1)
                .or_else(|| min.checked_sub(1))
                .map(|value| value.to_string()),
            Self::Pattern {
                ..
            } => PATTERN_VIOLATIONS
                .iter()
                .find(|candidate| !self.contains(candidate))
                .map(|candidate| (*candidate).to_string()),
            Self::OneOf {
                values,
            } => (0..=values.len())
                .map(|index| format!("__not_a_member_{index}__"))
                .find(|candidate| !values.contains(candidate)),
        }
    }

    /// Checks the domain is well formed for a parameter of the given kind.
    fn validate(&self, kind: ParameterKind) -> Result<(), String> {
        if kind == ParameterKind::Flag {
            return Err("flag parameters cannot declare a domain".to_string());
        }
        match self {
            Self::Range {
                min,
                max,
            } => {
                if kind != ParameterKind::Integer {
                    return Err("range domains require an integer parameter".to_string());
                }
                if min > max {
                    return Err(format!("range min {min} exceeds max {max}"));
                }
            }
            Self::Pattern {
                regex,
            } => {
                anchored(regex).map_err(|err| format!("invalid pattern: {err}"))?;
            }
            Self::OneOf {
                values,
            } => {
                if values.is_empty() {
                    return Err("one_of domain must list at least one value".to_string());
                }
            }
        }
        Ok(())
    }
}

/// Compiles a pattern anchored at both ends.
fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// Declared parameter of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterSpec {
    /// Parameter name; also the ambient key for ambient parameters.
    pub name: ParameterName,
    /// True when the operation must reject invocations without it.
    #[serde(default)]
    pub required: bool,
    /// Value type.
    #[serde(default)]
    pub kind: ParameterKind,
    /// Default applied by the console when the parameter is omitted.
    #[serde(default)]
    pub default: Option<String>,
    /// Declared valid-value domain.
    #[serde(default)]
    pub domain: Option<ValueDomain>,
    /// Representative valid values, most representative first.
    #[serde(default)]
    pub examples: Vec<String>,
    /// True when the operation accepts edge-case values for this parameter.
    #[serde(default)]
    pub edge_tolerant: bool,
    /// Delivery channel.
    #[serde(default)]
    pub source: ParameterSource,
}

impl ParameterSpec {
    /// Creates a required string parameter passed as a flag.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self::with_requirement(name, true)
    }

    /// Creates an optional string parameter passed as a flag.
    #[must_use]
    pub fn optional(name: impl Into<String>) -> Self {
        Self::with_requirement(name, false)
    }

    /// Shared constructor.
    fn with_requirement(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: ParameterName::new(name),
            required,
            kind: ParameterKind::String,
            default: None,
            domain: None,
            examples: Vec::new(),
            edge_tolerant: false,
            source: ParameterSource::Flag,
        }
    }

    /// Sets the value type.
    #[must_use]
    pub const fn kind(mut self, kind: ParameterKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the declared domain.
    #[must_use]
    pub fn domain(mut self, domain: ValueDomain) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Sets the console-side default.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the representative examples.
    #[must_use]
    pub fn examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the parameter as accepting edge-case values.
    #[must_use]
    pub const fn edge_tolerant(mut self) -> Self {
        self.edge_tolerant = true;
        self
    }

    /// Delivers the parameter through ambient configuration.
    #[must_use]
    pub const fn ambient(mut self) -> Self {
        self.source = ParameterSource::Ambient;
        self
    }

    /// Returns true when the value has the right type and lies in the domain.
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        let typed = match self.kind {
            ParameterKind::String => true,
            ParameterKind::Integer => value.parse::<i64>().is_ok(),
            ParameterKind::Flag => matches!(value, "true" | "false"),
        };
        typed && self.domain.as_ref().is_none_or(|domain| domain.contains(value))
    }

    /// Returns the distinct valid values known for this parameter, in
    /// preference order: examples, default, domain samples, type fallbacks.
    #[must_use]
    pub fn valid_values(&self) -> Vec<String> {
        if self.kind == ParameterKind::Flag {
            return vec!["true".to_string()];
        }
        let fallbacks: &[&str] = match self.kind {
            ParameterKind::Integer => &INTEGER_FALLBACKS,
            _ => &STRING_FALLBACKS,
        };
        let domain_samples = self.domain.as_ref().map(ValueDomain::samples).unwrap_or_default();
        let candidates = self
            .examples
            .iter()
            .cloned()
            .chain(self.default.iter().cloned())
            .chain(domain_samples)
            .chain(fallbacks.iter().map(|value| (*value).to_string()));
        let mut seen = BTreeSet::new();
        candidates
            .filter(|value| self.accepts(value))
            .filter(|value| seen.insert(value.clone()))
            .collect()
    }

    /// Returns the representative valid value.
    #[must_use]
    pub fn representative_value(&self) -> Option<String> {
        self.valid_values().into_iter().next()
    }

    /// Returns a valid value distinct from the representative when one
    /// exists, otherwise the representative itself.
    #[must_use]
    pub fn alternate_value(&self) -> Option<String> {
        let values = self.valid_values();
        values.get(1).or_else(|| values.first()).cloned()
    }

    /// Returns a value that violates the parameter's type or domain.
    ///
    /// Flags and unconstrained strings have no invalid value.
    #[must_use]
    pub fn invalid_value(&self) -> Option<String> {
        match (&self.domain, self.kind) {
            (_, ParameterKind::Flag) => None,
            (Some(domain), _) => domain.outside_value(),
            (None, ParameterKind::Integer) => Some(NOT_A_NUMBER.to_string()),
            (None, ParameterKind::String) => None,
        }
    }

    /// Returns true for unconstrained string parameters.
    #[must_use]
    pub const fn is_free_form(&self) -> bool {
        matches!(self.kind, ParameterKind::String) && self.domain.is_none()
    }

    /// Validates the parameter declaration.
    fn validate(&self) -> Result<(), DescriptorError> {
        let invalid = |reason: String| DescriptorError::InvalidParameter {
            parameter: self.name.to_string(),
            reason,
        };
        let name = self.name.as_str();
        if name.is_empty() || name.chars().any(|ch| ch.is_whitespace() || ch == '=') {
            return Err(invalid("name must be non-empty without whitespace or '='".to_string()));
        }
        if self.kind == ParameterKind::Flag {
            if self.required {
                return Err(invalid("flag parameters cannot be required".to_string()));
            }
            if self.source == ParameterSource::Ambient {
                return Err(invalid("flag parameters cannot be ambient".to_string()));
            }
        }
        if let Some(domain) = &self.domain {
            domain.validate(self.kind).map_err(invalid)?;
        }
        if let Some(default) = &self.default
            && !self.accepts(default)
        {
            return Err(invalid(format!("default {default:?} is outside the declared domain")));
        }
        if let Some(example) = self.examples.iter().find(|example| !self.accepts(example)) {
            return Err(invalid(format!("example {example:?} is outside the declared domain")));
        }
        if self.representative_value().is_none() {
            return Err(invalid("no valid value is known; add an example".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Operation Descriptor
// ============================================================================

/// Failure class to exit code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureExitCode {
    /// Failure class.
    pub class: FailureClass,
    /// Exit code the console uses for it.
    pub exit_code: i32,
}

/// Declarative contract for one console operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationDescriptor {
    /// Unique operation name.
    pub name: OperationName,
    /// Human-readable summary.
    #[serde(default)]
    pub description: Option<String>,
    /// Parameters in declaration order.
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    /// Exit code reported on success.
    #[serde(default)]
    pub success_exit_code: i32,
    /// Declared failure classes and their exit codes.
    #[serde(default)]
    pub failure_exit_codes: Vec<FailureExitCode>,
    /// True when the operation honors the ambient dry-run flag.
    #[serde(default)]
    pub supports_dry_run: bool,
    /// True when the operation honors the ambient timeout budget.
    #[serde(default)]
    pub supports_timeout: bool,
    /// Expected minimum duration; required when `supports_timeout` is set.
    #[serde(default)]
    pub min_duration_ms: Option<u64>,
    /// True when running the operation never mutates anything.
    #[serde(default)]
    pub side_effect_free: bool,
}

impl OperationDescriptor {
    /// Creates a descriptor with no parameters and success exit code 0.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: OperationName::new(name),
            description: None,
            parameters: Vec::new(),
            success_exit_code: 0,
            failure_exit_codes: Vec::new(),
            supports_dry_run: false,
            supports_timeout: false,
            min_duration_ms: None,
            side_effect_free: false,
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Sets the success exit code.
    #[must_use]
    pub const fn success_code(mut self, code: i32) -> Self {
        self.success_exit_code = code;
        self
    }

    /// Declares a failure class exit code.
    #[must_use]
    pub fn failure(mut self, class: FailureClass, exit_code: i32) -> Self {
        self.failure_exit_codes.push(FailureExitCode {
            class,
            exit_code,
        });
        self
    }

    /// Declares dry-run support.
    #[must_use]
    pub const fn dry_run(mut self) -> Self {
        self.supports_dry_run = true;
        self
    }

    /// Declares timeout support with the expected minimum duration.
    #[must_use]
    pub const fn timeout(mut self, min_duration_ms: u64) -> Self {
        self.supports_timeout = true;
        self.min_duration_ms = Some(min_duration_ms);
        self
    }

    /// Declares the operation side-effect free.
    #[must_use]
    pub const fn side_effect_free(mut self) -> Self {
        self.side_effect_free = true;
        self
    }

    /// Returns the exit-code table used to classify this operation's cases.
    #[must_use]
    pub fn exit_code_table(&self) -> ExitCodeTable {
        ExitCodeTable::new(
            Some(self.success_exit_code),
            self.failure_exit_codes.iter().map(|entry| (entry.class, entry.exit_code)).collect(),
        )
    }

    /// Returns the parameter with the given name.
    #[must_use]
    pub fn find_parameter(&self, name: &ParameterName) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|parameter| &parameter.name == name)
    }

    /// Validates the descriptor for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the name, a parameter, the exit-code
    /// table, or the capability flags are inconsistent.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        let name = self.name.as_str();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(DescriptorError::InvalidName(name.to_string()));
        }
        ensure_unique_parameters(&self.parameters)?;
        for parameter in &self.parameters {
            parameter.validate()?;
        }
        ensure_exit_codes_distinct(self)?;
        if self.supports_timeout
            && self.min_duration_ms.is_none_or(|duration| duration < MIN_TIMEOUT_DURATION_MS)
        {
            return Err(DescriptorError::MissingMinDuration(MIN_TIMEOUT_DURATION_MS));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Descriptor validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// Operation name is empty or contains whitespace.
    #[error("invalid operation name: {0:?}")]
    InvalidName(String),
    /// Two parameters share a name.
    #[error("duplicate parameter: {0}")]
    DuplicateParameter(String),
    /// A parameter declaration is inconsistent.
    #[error("invalid parameter {parameter}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        parameter: String,
        /// Failure description.
        reason: String,
    },
    /// The failure table declares a class whose code is not per-operation.
    #[error("failure class {0} cannot be declared per operation")]
    ReservedFailureClass(FailureClass),
    /// The failure table declares a class twice.
    #[error("failure class {0} declared more than once")]
    DuplicateFailureClass(FailureClass),
    /// Two table entries, or an entry and the timeout code, share an exit code.
    #[error("exit code {0} is declared more than once or is reserved")]
    ExitCodeCollision(i32),
    /// Timeout support declared without a usable minimum duration.
    #[error("supports_timeout requires min_duration_ms >= {0}")]
    MissingMinDuration(u64),
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Ensures parameter names are unique within the descriptor.
fn ensure_unique_parameters(parameters: &[ParameterSpec]) -> Result<(), DescriptorError> {
    let mut seen = BTreeSet::new();
    for parameter in parameters {
        if !seen.insert(parameter.name.as_str()) {
            return Err(DescriptorError::DuplicateParameter(parameter.name.to_string()));
        }
    }
    Ok(())
}

/// Ensures every exit code in the table maps to exactly one classification.
fn ensure_exit_codes_distinct(descriptor: &OperationDescriptor) -> Result<(), DescriptorError> {
    let mut classes = BTreeSet::new();
    let mut codes = BTreeSet::from([TIMEOUT_EXIT_CODE]);
    if !codes.insert(descriptor.success_exit_code) {
        return Err(DescriptorError::ExitCodeCollision(descriptor.success_exit_code));
    }
    for entry in &descriptor.failure_exit_codes {
        if matches!(entry.class, FailureClass::Timeout | FailureClass::UnknownOperation) {
            return Err(DescriptorError::ReservedFailureClass(entry.class));
        }
        if !classes.insert(entry.class) {
            return Err(DescriptorError::DuplicateFailureClass(entry.class));
        }
        if !codes.insert(entry.exit_code) {
            return Err(DescriptorError::ExitCodeCollision(entry.exit_code));
        }
    }
    Ok(())
}
