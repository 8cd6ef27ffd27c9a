// crates/opmatrix-core/src/runtime/registry.rs
// ============================================================================
// Module: opmatrix Operation Registry
// Description: Registered operation descriptors and the console-wide contract.
// Purpose: Reject duplicate registrations and resolve operations by name.
// Dependencies: thiserror, crate::core
// ============================================================================

//! ## Overview
//! Descriptors are registered once at harness start. Each one is validated
//! and frozen behind an [`Arc`]; callers only ever receive shared references,
//! so a descriptor's parameter set cannot change after registration.
//! Lookups of unregistered names fail with
//! [`RegistryError::UnknownOperation`], which maps to
//! [`FailureClass::UnknownOperation`] and nothing else.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::core::DescriptorError;
use crate::core::ExitCodeTable;
use crate::core::FailureClass;
use crate::core::OperationDescriptor;
use crate::core::OperationName;
use crate::core::TIMEOUT_EXIT_CODE;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default name used to probe unknown-operation handling.
pub const DEFAULT_UNKNOWN_OPERATION_NAME: &str = "Unknown_Operation";
/// Default exit code the console uses for unknown operations.
pub const DEFAULT_UNKNOWN_OPERATION_EXIT_CODE: i32 = 1;

// ============================================================================
// SECTION: Console Contract
// ============================================================================

/// Console-wide facts that do not belong to any single operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleContract {
    /// Name invoked by unknown-operation cases; never registrable.
    pub unknown_operation_name: OperationName,
    /// Exit code the console reports for unregistered names.
    pub unknown_operation_exit_code: i32,
}

impl Default for ConsoleContract {
    fn default() -> Self {
        Self {
            unknown_operation_name: OperationName::new(DEFAULT_UNKNOWN_OPERATION_NAME),
            unknown_operation_exit_code: DEFAULT_UNKNOWN_OPERATION_EXIT_CODE,
        }
    }
}

impl ConsoleContract {
    /// Returns the table that classifies unknown-operation cases.
    #[must_use]
    pub fn exit_code_table(&self) -> ExitCodeTable {
        ExitCodeTable::new(
            None,
            vec![(FailureClass::UnknownOperation, self.unknown_operation_exit_code)],
        )
    }

    /// Validates the contract.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidContract`] when the probe name is
    /// empty or the exit code collides with the reserved timeout code.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let name = self.unknown_operation_name.as_str();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidContract(format!(
                "unknown operation name {name:?} must be non-empty without whitespace"
            )));
        }
        if self.unknown_operation_exit_code == TIMEOUT_EXIT_CODE {
            return Err(RegistryError::InvalidContract(format!(
                "unknown operation exit code {TIMEOUT_EXIT_CODE} is reserved for timeouts"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry of operation descriptors keyed by name.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    /// Console-wide contract.
    console: ConsoleContract,
    /// Frozen descriptors by name.
    operations: BTreeMap<OperationName, Arc<OperationDescriptor>>,
    /// Names in registration order.
    order: Vec<OperationName>,
}

impl OperationRegistry {
    /// Creates an empty registry for a console.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidContract`] when the contract is invalid.
    pub fn new(console: ConsoleContract) -> Result<Self, RegistryError> {
        console.validate()?;
        Ok(Self {
            console,
            operations: BTreeMap::new(),
            order: Vec::new(),
        })
    }

    /// Registers a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateOperation`] when the name is taken,
    /// [`RegistryError::ReservedName`] when it equals the unknown-operation
    /// probe name, and [`RegistryError::InvalidDescriptor`] when validation
    /// fails.
    pub fn register(&mut self, descriptor: OperationDescriptor) -> Result<(), RegistryError> {
        if self.operations.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateOperation(descriptor.name));
        }
        if descriptor.name == self.console.unknown_operation_name {
            return Err(RegistryError::ReservedName(descriptor.name));
        }
        descriptor.validate().map_err(|source| RegistryError::InvalidDescriptor {
            operation: descriptor.name.clone(),
            source,
        })?;
        self.order.push(descriptor.name.clone());
        self.operations.insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(())
    }

    /// Looks up a descriptor by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownOperation`] when the name is absent.
    pub fn lookup(&self, name: &OperationName) -> Result<&Arc<OperationDescriptor>, RegistryError> {
        self.operations.get(name).ok_or_else(|| RegistryError::UnknownOperation(name.clone()))
    }

    /// Returns true when the name is registered.
    #[must_use]
    pub fn contains(&self, name: &OperationName) -> bool {
        self.operations.contains_key(name)
    }

    /// Returns registered names in registration order.
    #[must_use]
    pub fn names(&self) -> &[OperationName] {
        &self.order
    }

    /// Iterates descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<OperationDescriptor>> {
        self.order.iter().filter_map(|name| self.operations.get(name))
    }

    /// Returns the number of registered operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the console-wide contract.
    #[must_use]
    pub const fn console(&self) -> &ConsoleContract {
        &self.console
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A descriptor with the same name is already registered.
    #[error("operation already registered: {0}")]
    DuplicateOperation(OperationName),
    /// No descriptor is registered under the name.
    #[error("unknown operation: {0}")]
    UnknownOperation(OperationName),
    /// The name is reserved for unknown-operation probing.
    #[error("operation name is reserved for unknown-operation probing: {0}")]
    ReservedName(OperationName),
    /// The descriptor failed validation.
    #[error("invalid descriptor {operation}: {source}")]
    InvalidDescriptor {
        /// Operation name.
        operation: OperationName,
        /// Validation failure.
        source: DescriptorError,
    },
    /// The console contract is invalid.
    #[error("invalid console contract: {0}")]
    InvalidContract(String),
}

impl RegistryError {
    /// Returns the failure class this error represents, if any.
    #[must_use]
    pub const fn failure_class(&self) -> Option<FailureClass> {
        match self {
            Self::UnknownOperation(_) => Some(FailureClass::UnknownOperation),
            _ => None,
        }
    }
}
