// crates/opmatrix-runner/src/runner.rs
// ============================================================================
// Module: opmatrix Suite Runner
// Description: Executes synthesized matrices against the target console.
// Purpose: Run operations in parallel and cases sequentially within each.
// Dependencies: tokio, tracing, serde, opmatrix-core
// ============================================================================

//! ## Overview
//! The suite runner synthesizes every requested matrix up front, then runs
//! one task per operation on a `JoinSet`, bounded by a semaphore. Inside an
//! operation the cases run in order on a private [`EnvironmentScope`]; the
//! scope guard is held across the invocation so the child sees exactly the
//! case overrides layered on the base ambient state.
//!
//! A harness fault fails the case it hit and nothing else. Cancellation
//! fails the in-flight case and skips the rest.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use opmatrix_core::AmbientState;
use opmatrix_core::AssertionEvaluator;
use opmatrix_core::EnvironmentScope;
use opmatrix_core::Fingerprint;
use opmatrix_core::HarnessFault;
use opmatrix_core::HashError;
use opmatrix_core::MatrixSynthesizer;
use opmatrix_core::OperationName;
use opmatrix_core::OperationRegistry;
use opmatrix_core::ProbeState;
use opmatrix_core::SideEffectProbe;
use opmatrix_core::SynthesisError;
use opmatrix_core::TestCase;
use opmatrix_core::TestCategory;
use opmatrix_core::TestMatrix;
use opmatrix_core::Verdict;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::cancel::CancelHandle;
use crate::cancel::CancelToken;
use crate::invoker::Invoker;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Process-level settings for a suite run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Console executable.
    pub program: PathBuf,
    /// Budget for cases without their own.
    pub default_timeout: Duration,
    /// Ambient values present for every case.
    pub base_ambient: AmbientState,
    /// Operations allowed to run at once.
    pub max_parallel_operations: usize,
}

impl RunnerSettings {
    /// Creates settings with an empty base ambient state and one operation at a time.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, default_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            default_timeout,
            base_ambient: AmbientState::new(),
            max_parallel_operations: 1,
        }
    }
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Verdicts for one operation's matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationReport {
    /// Operation under test.
    pub operation: OperationName,
    /// Fingerprint of the executed matrix.
    pub fingerprint: Fingerprint,
    /// Verdicts in matrix order.
    pub verdicts: Vec<Verdict>,
    /// Cases not run because the suite was cancelled.
    pub skipped: usize,
}

impl OperationReport {
    /// Returns the number of passed verdicts.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.verdicts.iter().filter(|verdict| verdict.passed).count()
    }

    /// Returns the number of failed verdicts.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.verdicts.len() - self.passed()
    }

    /// Returns true when every case ran and passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.skipped == 0 && self.verdicts.iter().all(|verdict| verdict.passed)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures that stop a suite before or between operations.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// A matrix could not be synthesized.
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    /// A matrix could not be fingerprinted.
    #[error(transparent)]
    Hash(#[from] HashError),
    /// An operation task did not complete.
    #[error("operation task failed: {0}")]
    Join(String),
}

// ============================================================================
// SECTION: Suite Runner
// ============================================================================

/// Runs synthesized matrices against the console.
pub struct SuiteRunner {
    /// Registered operations.
    registry: Arc<OperationRegistry>,
    /// Matrix generator.
    synthesizer: MatrixSynthesizer,
    /// Verdict producer.
    evaluator: AssertionEvaluator,
    /// Process settings.
    settings: RunnerSettings,
    /// Side-effect probes by operation.
    probes: BTreeMap<OperationName, Arc<dyn SideEffectProbe>>,
    /// Suite cancellation.
    cancel: CancelHandle,
}

impl SuiteRunner {
    /// Creates a runner over a registry.
    #[must_use]
    pub fn new(
        registry: Arc<OperationRegistry>,
        synthesizer: MatrixSynthesizer,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            evaluator: AssertionEvaluator::new(Arc::clone(&registry)),
            registry,
            synthesizer,
            settings,
            probes: BTreeMap::new(),
            cancel: CancelHandle::new(),
        }
    }

    /// Attaches a side-effect probe consulted around the operation's dry-run cases.
    #[must_use]
    pub fn with_probe(mut self, operation: OperationName, probe: Arc<dyn SideEffectProbe>) -> Self {
        self.probes.insert(operation, probe);
        self
    }

    /// Returns a handle that cancels this runner's suites.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Synthesizes the verified matrices for the named operations.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Synthesis`] when any operation cannot be synthesized.
    pub fn matrices(&self, names: &[OperationName]) -> Result<Vec<TestMatrix>, RunnerError> {
        names
            .iter()
            .map(|name| self.synthesizer.synthesize_for(&self.registry, name).map_err(Into::into))
            .collect()
    }

    /// Runs every registered operation in registration order.
    ///
    /// # Errors
    ///
    /// See [`SuiteRunner::run`].
    pub async fn run_all(&self) -> Result<Vec<OperationReport>, RunnerError> {
        let names = self.registry.names().to_vec();
        self.run(&names).await
    }

    /// Runs one operation.
    ///
    /// # Errors
    ///
    /// See [`SuiteRunner::run`].
    pub async fn run_operation(&self, name: &OperationName) -> Result<OperationReport, RunnerError> {
        self.run(std::slice::from_ref(name))
            .await?
            .pop()
            .ok_or_else(|| RunnerError::Join(format!("no report for {name}")))
    }

    /// Runs the named operations and returns their reports in request order.
    ///
    /// All matrices are synthesized before any process is spawned.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Synthesis`] or [`RunnerError::Hash`] before
    /// anything runs, and [`RunnerError::Join`] when an operation task panics.
    pub async fn run(&self, names: &[OperationName]) -> Result<Vec<OperationReport>, RunnerError> {
        let mut planned = Vec::with_capacity(names.len());
        for matrix in self.matrices(names)? {
            let fingerprint = matrix.fingerprint()?;
            planned.push((matrix, fingerprint));
        }

        let semaphore = Arc::new(Semaphore::new(self.settings.max_parallel_operations.max(1)));
        let mut tasks = JoinSet::new();
        for (index, (matrix, fingerprint)) in planned.into_iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|err| RunnerError::Join(err.to_string()))?;
            let task = OperationTask {
                evaluator: self.evaluator.clone(),
                invoker: Invoker::new(&self.settings.program, self.settings.default_timeout)
                    .with_cancel(self.cancel.token())
                    .with_managed_keys(self.managed_keys(&matrix)),
                scope: EnvironmentScope::new(self.settings.base_ambient.clone()),
                probe: self.probes.get(matrix.operation()).cloned(),
                cancel: self.cancel.token(),
            };
            tasks.spawn(async move {
                let report = task.run(matrix, fingerprint).await;
                drop(permit);
                (index, report)
            });
        }

        let mut reports = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let (index, report) = joined.map_err(|err| RunnerError::Join(err.to_string()))?;
            reports.push((index, report));
        }
        reports.sort_by_key(|(index, _)| *index);
        Ok(reports.into_iter().map(|(_, report)| report).collect())
    }

    /// Ambient keys any case of the matrix overrides, plus the dry-run and
    /// timeout keys.
    fn managed_keys(&self, matrix: &TestMatrix) -> BTreeSet<String> {
        let options = self.synthesizer.options();
        let mut keys: BTreeSet<String> =
            matrix.cases().iter().flat_map(|case| case.ambient().keys().cloned()).collect();
        keys.insert(options.dry_run_key.clone());
        keys.insert(options.timeout_key.clone());
        keys
    }
}

// ============================================================================
// SECTION: Operation Task
// ============================================================================

/// Everything one operation task owns.
struct OperationTask {
    /// Verdict producer.
    evaluator: AssertionEvaluator,
    /// Process spawner.
    invoker: Invoker,
    /// Private ambient scope.
    scope: EnvironmentScope,
    /// Probe for dry-run cases.
    probe: Option<Arc<dyn SideEffectProbe>>,
    /// Suite cancellation.
    cancel: CancelToken,
}

impl OperationTask {
    /// Runs the matrix cases in order.
    async fn run(self, matrix: TestMatrix, fingerprint: Fingerprint) -> OperationReport {
        let mut verdicts = Vec::with_capacity(matrix.len());
        let mut skipped = 0;
        for case in matrix.cases() {
            if self.cancel.is_cancelled() {
                skipped += 1;
                continue;
            }
            let verdict = self.run_case(case).await;
            debug!(
                case = %verdict.case_id,
                passed = verdict.passed,
                observed = %verdict.observed,
                "case finished"
            );
            verdicts.push(verdict);
        }
        let report = OperationReport {
            operation: matrix.operation().clone(),
            fingerprint,
            verdicts,
            skipped,
        };
        info!(
            operation = %report.operation,
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped,
            "operation finished"
        );
        report
    }

    /// Runs one case inside its ambient overrides.
    async fn run_case(&self, case: &TestCase) -> Verdict {
        let guard = match self.scope.enter(case.ambient()) {
            Ok(guard) => guard,
            Err(err) => return self.fault(case, err.to_string()),
        };
        let snapshot = match self.scope.snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => return self.fault(case, err.to_string()),
        };
        let probe = self.probe.as_deref().filter(|_| case.category() == TestCategory::DryRun);
        let before = match probe.map(|probe| probe.observe(case.operation())).transpose() {
            Ok(before) => before,
            Err(err) => return self.fault(case, err.to_string()),
        };

        let budget = case.timeout_budget_ms().map(Duration::from_millis);
        let result = self.invoker.invoke(case.argv(), &snapshot, budget).await;
        drop(guard);

        let verdict = match result {
            Ok(result) => self.evaluator.evaluate(case, &result),
            Err(err) => {
                warn!(case = %case.id(), error = %err, "invocation failed");
                self.evaluator.evaluate_error(case, &err.fault())
            }
        };
        match (probe, before) {
            (Some(probe), Some(before)) => self.check_probe(case, verdict, probe, &before),
            _ => verdict,
        }
    }

    /// Compares the post-run observation with the pre-run one.
    fn check_probe(
        &self,
        case: &TestCase,
        verdict: Verdict,
        probe: &dyn SideEffectProbe,
        before: &ProbeState,
    ) -> Verdict {
        match probe.observe(case.operation()) {
            Ok(after) => AssertionEvaluator::apply_probe(verdict, before, &after),
            Err(err) if verdict.passed => self.fault(case, err.to_string()),
            Err(_) => verdict,
        }
    }

    /// Fails a case with a harness-internal fault.
    fn fault(&self, case: &TestCase, message: String) -> Verdict {
        warn!(case = %case.id(), reason = %message, "harness fault");
        self.evaluator.evaluate_error(case, &HarnessFault::Internal(message))
    }
}
