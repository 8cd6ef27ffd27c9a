// crates/opmatrix-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared descriptors for opmatrix-core integration tests.
// Purpose: Model the service console operations used across suites.
// Dependencies: opmatrix-core
// ============================================================================

//! ## Overview
//! Descriptors for a service console with a health check, a package upgrade
//! and a node replacement operation, plus a registry builder.

#![allow(
    dead_code,
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use opmatrix_core::ConsoleContract;
use opmatrix_core::FailureClass;
use opmatrix_core::OperationDescriptor;
use opmatrix_core::OperationRegistry;
use opmatrix_core::ParameterKind;
use opmatrix_core::ParameterSpec;
use opmatrix_core::ValueDomain;

/// Health check: no required parameters, side-effect free.
pub fn health_check() -> OperationDescriptor {
    OperationDescriptor::new("Health_Check")
        .parameter(
            ParameterSpec::optional("nodes")
                .kind(ParameterKind::Integer)
                .domain(ValueDomain::Range {
                    min: 1,
                    max: 64,
                })
                .examples(["3", "5"]),
        )
        .parameter(ParameterSpec::optional("services").domain(ValueDomain::OneOf {
            values: vec!["api".to_string(), "db".to_string(), "cache".to_string()],
        }))
        .failure(FailureClass::Validation, 1)
        .side_effect_free()
}

/// Node replacement: required ambient `NODE_ID`, dry-run capable.
pub fn node_replacement() -> OperationDescriptor {
    OperationDescriptor::new("Node_Replacement")
        .parameter(
            ParameterSpec::required("NODE_ID")
                .ambient()
                .domain(ValueDomain::Pattern {
                    regex: "node-[0-9]+".to_string(),
                })
                .examples(["node-1", "node-2"]),
        )
        .failure(FailureClass::Validation, 1)
        .dry_run()
}

/// Upgrade: required version, optional flag and note, dry-run and timeout capable.
pub fn upgrade() -> OperationDescriptor {
    OperationDescriptor::new("Upgrade")
        .parameter(
            ParameterSpec::required("version")
                .domain(ValueDomain::Pattern {
                    regex: r"[0-9]+\.[0-9]+\.[0-9]+".to_string(),
                })
                .examples(["1.2.3", "1.2.4"]),
        )
        .parameter(ParameterSpec::optional("force").kind(ParameterKind::Flag))
        .parameter(ParameterSpec::optional("release_note"))
        .failure(FailureClass::Validation, 1)
        .dry_run()
        .timeout(1000)
}

/// Registry holding every service console operation.
pub fn service_registry() -> OperationRegistry {
    let mut registry = OperationRegistry::new(ConsoleContract::default()).expect("registry");
    registry.register(health_check()).expect("health check");
    registry.register(upgrade()).expect("upgrade");
    registry.register(node_replacement()).expect("node replacement");
    registry
}
