// crates/opmatrix-core/src/runtime/synthesizer.rs
// ============================================================================
// Module: opmatrix Matrix Synthesizer
// Description: Deterministic descriptor to test-matrix generation.
// Purpose: Produce the standard behavioral battery for every operation.
// Dependencies: thiserror, crate::core, crate::runtime::registry
// ============================================================================

//! ## Overview
//! [`MatrixSynthesizer::synthesize`] is a pure function of the descriptor and
//! the [`SynthesisOptions`]. Categories are emitted in the order of
//! [`TestCategory::ALL`]; within a category, cases follow parameter
//! declaration order. Every case starts from the smoke invocation (required
//! parameters at their representative value) and changes exactly one thing.
//!
//! Case identifiers have the form
//! `<operation>::<category>[::<parameter>[::<variant>]]`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::AmbientOverrides;
use crate::core::AmbientValue;
use crate::core::FailureClass;
use crate::core::OperationDescriptor;
use crate::core::OperationName;
use crate::core::Outcome;
use crate::core::ParameterKind;
use crate::core::ParameterName;
use crate::core::ParameterSource;
use crate::core::ParameterSpec;
use crate::core::TestCase;
use crate::core::TestCaseId;
use crate::core::TestCaseParts;
use crate::core::TestCategory;
use crate::core::TestMatrix;
use crate::runtime::registry::DEFAULT_UNKNOWN_OPERATION_NAME;
use crate::runtime::registry::OperationRegistry;
use crate::runtime::registry::RegistryError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default console subcommand that runs an operation.
pub const DEFAULT_RUN_SUBCOMMAND: &str = "run";
/// Default ambient key for the dry-run flag.
pub const DEFAULT_DRY_RUN_KEY: &str = "DRY_RUN";
/// Default ambient key for the timeout budget in milliseconds.
pub const DEFAULT_TIMEOUT_KEY: &str = "TIMEOUT_MS";
/// Default length of the oversized edge-case value.
pub const DEFAULT_EDGE_MAX_LEN: usize = 4096;
/// Special-character edge-case value.
pub const SPECIAL_CHARACTERS: &str = "t\u{20ac}st!@#$%^&*()'\";|<>";
/// Ambient value that enables dry-run mode.
const DRY_RUN_ENABLED: &str = "1";
/// Divisor applied to the expected minimum duration to derive a timeout budget.
const TIMEOUT_BUDGET_DIVISOR: u64 = 10;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Console conventions the synthesizer encodes into test cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Subcommand placed before the operation name.
    pub run_subcommand: String,
    /// Ambient key that enables dry-run mode.
    pub dry_run_key: String,
    /// Ambient key that publishes the timeout budget.
    pub timeout_key: String,
    /// Operation name used by unknown-operation cases.
    pub unknown_operation_name: OperationName,
    /// Length of the oversized edge-case value.
    pub edge_max_len: usize,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            run_subcommand: DEFAULT_RUN_SUBCOMMAND.to_string(),
            dry_run_key: DEFAULT_DRY_RUN_KEY.to_string(),
            timeout_key: DEFAULT_TIMEOUT_KEY.to_string(),
            unknown_operation_name: OperationName::new(DEFAULT_UNKNOWN_OPERATION_NAME),
            edge_max_len: DEFAULT_EDGE_MAX_LEN,
        }
    }
}

/// Returns the timeout budget derived from an expected minimum duration.
#[must_use]
pub const fn timeout_budget_ms(min_duration_ms: u64) -> u64 {
    let budget = min_duration_ms / TIMEOUT_BUDGET_DIVISOR;
    if budget == 0 { 1 } else { budget }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Matrix synthesis failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    /// Two synthesis passes over the same descriptor disagreed.
    #[error("synthesis is not deterministic for operation {0}")]
    NonDeterministic(OperationName),
    /// The unknown-operation probe name is registered, so the probe is meaningless.
    #[error("unknown-operation probe name is registered: {0}")]
    ProbeNameRegistered(OperationName),
    /// Registry lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// ============================================================================
// SECTION: Synthesizer
// ============================================================================

/// Generates test matrices from operation descriptors.
#[derive(Debug, Clone, Default)]
pub struct MatrixSynthesizer {
    /// Console conventions.
    options: SynthesisOptions,
}

impl MatrixSynthesizer {
    /// Creates a synthesizer for the given console conventions.
    #[must_use]
    pub const fn new(options: SynthesisOptions) -> Self {
        Self {
            options,
        }
    }

    /// Returns the console conventions in use.
    #[must_use]
    pub const fn options(&self) -> &SynthesisOptions {
        &self.options
    }

    /// Synthesizes the full matrix for a descriptor.
    #[must_use]
    pub fn synthesize(&self, descriptor: &OperationDescriptor) -> TestMatrix {
        let mut cases = Vec::new();
        cases.push(self.smoke(descriptor));
        cases.extend(self.variations(descriptor));
        cases.extend(self.missing_required(descriptor));
        cases.extend(self.invalid_values(descriptor));
        cases.push(self.unknown_operation(descriptor));
        cases.extend(self.edge_cases(descriptor));
        if descriptor.supports_dry_run {
            cases.push(self.dry_run(descriptor));
        }
        if let Some(min_duration_ms) = descriptor.min_duration_ms.filter(|_| descriptor.supports_timeout)
        {
            cases.push(self.timeout(descriptor, min_duration_ms));
        }
        TestMatrix::new(descriptor.name.clone(), cases)
    }

    /// Synthesizes twice and fails when the passes disagree.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::NonDeterministic`] when the two matrices differ.
    pub fn synthesize_verified(
        &self,
        descriptor: &OperationDescriptor,
    ) -> Result<TestMatrix, SynthesisError> {
        let first = self.synthesize(descriptor);
        let second = self.synthesize(descriptor);
        if first != second {
            return Err(SynthesisError::NonDeterministic(descriptor.name.clone()));
        }
        Ok(first)
    }

    /// Synthesizes the verified matrix for a registered operation.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::ProbeNameRegistered`] when the registry
    /// contains the unknown-operation probe name, [`SynthesisError::Registry`]
    /// when the operation is not registered, and
    /// [`SynthesisError::NonDeterministic`] when synthesis disagrees with itself.
    pub fn synthesize_for(
        &self,
        registry: &OperationRegistry,
        name: &OperationName,
    ) -> Result<TestMatrix, SynthesisError> {
        if registry.contains(&self.options.unknown_operation_name) {
            return Err(SynthesisError::ProbeNameRegistered(
                self.options.unknown_operation_name.clone(),
            ));
        }
        let descriptor = registry.lookup(name)?;
        self.synthesize_verified(descriptor)
    }

    // ------------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------------

    /// Required parameters only, at their representative values.
    fn smoke(&self, descriptor: &OperationDescriptor) -> TestCase {
        let invocation = self.invocation(descriptor, &Adjustment::None);
        self.case(CaseDraft {
            descriptor,
            category: TestCategory::Smoke,
            parameter: None,
            variant: None,
            invocation,
            timeout_budget_ms: None,
            expected: Outcome::Success,
            description: "required parameters at representative values".to_string(),
        })
    }

    /// One case per optional parameter at an alternate valid value.
    fn variations(&self, descriptor: &OperationDescriptor) -> Vec<TestCase> {
        descriptor
            .parameters
            .iter()
            .filter(|parameter| !parameter.required)
            .map(|parameter| {
                let value = parameter.alternate_value().unwrap_or_default();
                let invocation = self.invocation(
                    descriptor,
                    &Adjustment::Replace(&parameter.name, value.clone()),
                );
                self.case(CaseDraft {
                    descriptor,
                    category: TestCategory::Variation,
                    parameter: Some(parameter),
                    variant: None,
                    invocation,
                    timeout_budget_ms: None,
                    expected: Outcome::Success,
                    description: format!("optional {} set to {value:?}", parameter.name),
                })
            })
            .collect()
    }

    /// One case per required parameter with that parameter omitted.
    fn missing_required(&self, descriptor: &OperationDescriptor) -> Vec<TestCase> {
        descriptor
            .parameters
            .iter()
            .filter(|parameter| parameter.required)
            .map(|parameter| {
                let invocation = self.invocation(descriptor, &Adjustment::Omit(&parameter.name));
                self.case(CaseDraft {
                    descriptor,
                    category: TestCategory::MissingRequired,
                    parameter: Some(parameter),
                    variant: None,
                    invocation,
                    timeout_budget_ms: None,
                    expected: Outcome::Failure(FailureClass::Validation),
                    description: format!("required {} omitted", parameter.name),
                })
            })
            .collect()
    }

    /// One case per constrained parameter with a value outside its domain.
    fn invalid_values(&self, descriptor: &OperationDescriptor) -> Vec<TestCase> {
        descriptor
            .parameters
            .iter()
            .filter_map(|parameter| parameter.invalid_value().map(|value| (parameter, value)))
            .map(|(parameter, value)| {
                let invocation = self.invocation(
                    descriptor,
                    &Adjustment::Replace(&parameter.name, value.clone()),
                );
                self.case(CaseDraft {
                    descriptor,
                    category: TestCategory::InvalidValue,
                    parameter: Some(parameter),
                    variant: None,
                    invocation,
                    timeout_budget_ms: None,
                    expected: Outcome::Failure(FailureClass::Validation),
                    description: format!("{} set outside its domain to {value:?}", parameter.name),
                })
            })
            .collect()
    }

    /// The unknown-operation probe, independent of the descriptor's contents.
    fn unknown_operation(&self, descriptor: &OperationDescriptor) -> TestCase {
        let invocation = Invocation {
            argv: vec![
                self.options.run_subcommand.clone(),
                self.options.unknown_operation_name.to_string(),
            ],
            ambient: AmbientOverrides::new(),
        };
        self.case(CaseDraft {
            descriptor,
            category: TestCategory::UnknownOperation,
            parameter: None,
            variant: None,
            invocation,
            timeout_budget_ms: None,
            expected: Outcome::Failure(FailureClass::UnknownOperation),
            description: format!(
                "unregistered operation {} is rejected",
                self.options.unknown_operation_name
            ),
        })
    }

    /// Empty, oversized, and special-character values for free-form strings.
    fn edge_cases(&self, descriptor: &OperationDescriptor) -> Vec<TestCase> {
        let variants = [
            ("empty", String::new()),
            ("max_size", "x".repeat(self.options.edge_max_len)),
            ("special_chars", SPECIAL_CHARACTERS.to_string()),
        ];
        let mut cases = Vec::new();
        for parameter in descriptor.parameters.iter().filter(|parameter| parameter.is_free_form()) {
            let expected = if parameter.edge_tolerant {
                Outcome::Success
            } else {
                Outcome::Failure(FailureClass::Validation)
            };
            for (variant, value) in &variants {
                let invocation = self.invocation(
                    descriptor,
                    &Adjustment::Replace(&parameter.name, value.clone()),
                );
                cases.push(self.case(CaseDraft {
                    descriptor,
                    category: TestCategory::EdgeCase,
                    parameter: Some(parameter),
                    variant: Some(variant),
                    invocation,
                    timeout_budget_ms: None,
                    expected,
                    description: format!("{} set to the {variant} edge value", parameter.name),
                }));
            }
        }
        cases
    }

    /// Smoke invocation with the ambient dry-run flag enabled.
    fn dry_run(&self, descriptor: &OperationDescriptor) -> TestCase {
        let mut invocation = self.invocation(descriptor, &Adjustment::None);
        invocation
            .ambient
            .insert(self.options.dry_run_key.clone(), AmbientValue::set(DRY_RUN_ENABLED));
        self.case(CaseDraft {
            descriptor,
            category: TestCategory::DryRun,
            parameter: None,
            variant: None,
            invocation,
            timeout_budget_ms: None,
            expected: Outcome::Success,
            description: "dry run completes without side effects".to_string(),
        })
    }

    /// Smoke invocation under a budget below the expected minimum duration.
    fn timeout(&self, descriptor: &OperationDescriptor, min_duration_ms: u64) -> TestCase {
        let budget = timeout_budget_ms(min_duration_ms);
        let mut invocation = self.invocation(descriptor, &Adjustment::None);
        invocation
            .ambient
            .insert(self.options.timeout_key.clone(), AmbientValue::set(budget.to_string()));
        self.case(CaseDraft {
            descriptor,
            category: TestCategory::Timeout,
            parameter: None,
            variant: None,
            invocation,
            timeout_budget_ms: Some(budget),
            expected: Outcome::Failure(FailureClass::Timeout),
            description: format!("{budget} ms budget against a {min_duration_ms} ms minimum"),
        })
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Builds the smoke invocation with one adjustment applied.
    fn invocation(&self, descriptor: &OperationDescriptor, adjustment: &Adjustment<'_>) -> Invocation {
        let mut argv = vec![self.options.run_subcommand.clone(), descriptor.name.to_string()];
        let mut ambient = AmbientOverrides::new();
        for parameter in &descriptor.parameters {
            let value = match adjustment {
                Adjustment::Omit(name) if *name == &parameter.name => None,
                Adjustment::Replace(name, value) if *name == &parameter.name => Some(value.clone()),
                _ if parameter.required => {
                    // Registration guarantees a representative value.
                    Some(parameter.representative_value().unwrap_or_default())
                }
                _ => continue,
            };
            place(parameter, value, &mut argv, &mut ambient);
        }
        Invocation {
            argv,
            ambient,
        }
    }

    /// Assembles a case from a draft.
    fn case(&self, draft: CaseDraft<'_>) -> TestCase {
        let mut id = format!("{}::{}", draft.descriptor.name, draft.category);
        if let Some(parameter) = draft.parameter {
            id.push_str("::");
            id.push_str(parameter.name.as_str());
        }
        if let Some(variant) = draft.variant {
            id.push_str("::");
            id.push_str(variant);
        }
        TestCase::from_parts(TestCaseParts {
            id: TestCaseId::new(id),
            operation: draft.descriptor.name.clone(),
            category: draft.category,
            parameter: draft.parameter.map(|parameter| parameter.name.clone()),
            argv: draft.invocation.argv,
            ambient: draft.invocation.ambient,
            timeout_budget_ms: draft.timeout_budget_ms,
            expected: draft.expected,
            description: draft.description,
        })
    }
}

/// Places one parameter value into the argument list or ambient overrides.
///
/// `None` omits the parameter; omitted ambient parameters are explicitly
/// unset so base ambient values cannot satisfy them.
fn place(
    parameter: &ParameterSpec,
    value: Option<String>,
    argv: &mut Vec<String>,
    ambient: &mut AmbientOverrides,
) {
    match (parameter.source, value) {
        (ParameterSource::Ambient, Some(value)) => {
            ambient.insert(parameter.name.to_string(), AmbientValue::Set(value));
        }
        (ParameterSource::Ambient, None) => {
            ambient.insert(parameter.name.to_string(), AmbientValue::Unset);
        }
        (ParameterSource::Flag, Some(_)) if parameter.kind == ParameterKind::Flag => {
            argv.push(parameter.name.flag());
        }
        (ParameterSource::Flag, Some(value)) => {
            argv.push(parameter.name.flag());
            argv.push(value);
        }
        (ParameterSource::Flag, None) => {}
    }
}

// ============================================================================
// SECTION: Drafts
// ============================================================================

/// Single change applied to the smoke invocation.
enum Adjustment<'a> {
    /// No change.
    None,
    /// Omit the named parameter.
    Omit(&'a ParameterName),
    /// Pass the named parameter with this value.
    Replace(&'a ParameterName, String),
}

/// Rendered arguments and ambient overrides.
struct Invocation {
    /// Arguments after the console executable.
    argv: Vec<String>,
    /// Ambient overrides.
    ambient: AmbientOverrides,
}

/// Inputs for one case before identifier assembly.
struct CaseDraft<'a> {
    /// Owning descriptor.
    descriptor: &'a OperationDescriptor,
    /// Case category.
    category: TestCategory,
    /// Targeted parameter.
    parameter: Option<&'a ParameterSpec>,
    /// Variant label for categories with several cases per parameter.
    variant: Option<&'a str>,
    /// Rendered invocation.
    invocation: Invocation,
    /// Timeout budget.
    timeout_budget_ms: Option<u64>,
    /// Expected outcome.
    expected: Outcome,
    /// Description.
    description: String,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
