// system-tests/tests/helpers/harness.rs
// ============================================================================
// Module: Service Console Harness
// Description: Builds configs and runners around the stub console.
// Purpose: Give every suite an isolated state directory and config file.
// Dependencies: opmatrix-config, opmatrix-runner, tempfile
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use opmatrix_config::HarnessConfig;
use opmatrix_core::MatrixSynthesizer;
use opmatrix_runner::RunnerSettings;
use opmatrix_runner::SuiteRunner;
use system_tests::settings::SuiteSettings;
use tempfile::TempDir;

/// Default per-case timeout for stub runs.
const CASE_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns the stub console built alongside these tests.
pub fn stub_console() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_service-console-stub"))
}

/// Renders the service console config for a binary and state directory.
pub fn service_config_toml(binary: &Path, state_dir: &Path, timeout: Duration) -> String {
    format!(
        r#"
[console]
binary = {binary:?}

[ambient]
base = {{ SERVICE_STATE_DIR = {state_dir:?}, UPGRADE_DURATION_MS = "1500" }}

[limits]
default_timeout_ms = {timeout_ms}
max_parallel_operations = 3

[[operations]]
name = "Health_Check"
description = "Reports cluster health"
side_effect_free = true
failure_exit_codes = [{{ class = "validation", exit_code = 1 }}]

[[operations.parameters]]
name = "nodes"
kind = "integer"
domain = {{ kind = "range", min = 1, max = 64 }}
examples = ["3", "5"]

[[operations.parameters]]
name = "services"
domain = {{ kind = "one_of", values = ["api", "db", "cache"] }}

[[operations]]
name = "Node_Replacement"
description = "Replaces a cluster node"
supports_dry_run = true
failure_exit_codes = [{{ class = "validation", exit_code = 1 }}]

[[operations.parameters]]
name = "NODE_ID"
required = true
source = "ambient"
domain = {{ kind = "pattern", regex = "node-[0-9]+" }}
examples = ["node-1", "node-2"]

[[operations]]
name = "Upgrade"
description = "Upgrades the service package"
supports_dry_run = true
supports_timeout = true
min_duration_ms = 1000
failure_exit_codes = [{{ class = "validation", exit_code = 1 }}]

[[operations.parameters]]
name = "version"
required = true
domain = {{ kind = "pattern", regex = '[0-9]+\.[0-9]+\.[0-9]+' }}
examples = ["1.2.3", "1.2.4"]

[[operations.parameters]]
name = "force"
kind = "flag"

[[operations.parameters]]
name = "release_note"
"#,
        binary = binary.display().to_string(),
        state_dir = state_dir.display().to_string(),
        timeout_ms = timeout.as_millis(),
    )
}

/// Isolated run root holding a config file and a console state directory.
pub struct ServiceHarness {
    /// Run root; removed on drop.
    root: TempDir,
    /// Directory the console mutates.
    state_dir: PathBuf,
    /// Written config file.
    config_path: PathBuf,
    /// Parsed config.
    config: HarnessConfig,
}

impl ServiceHarness {
    /// Creates a harness around the stub console.
    pub fn new() -> Self {
        Self::with_binary(&stub_console())
    }

    /// Creates a harness around an arbitrary console binary.
    pub fn with_binary(binary: &Path) -> Self {
        let settings = SuiteSettings::from_env().expect("suite settings");
        let root = match &settings.run_root {
            Some(parent) => {
                fs::create_dir_all(parent).expect("create run root parent");
                tempfile::Builder::new().prefix("opmatrix-").tempdir_in(parent)
            }
            None => tempfile::Builder::new().prefix("opmatrix-").tempdir(),
        }
        .expect("run root");
        let state_dir = root.path().join("state");
        fs::create_dir_all(&state_dir).expect("state dir");
        let content = service_config_toml(binary, &state_dir, settings.timeout_for(CASE_TIMEOUT));
        let config_path = root.path().join("opmatrix.toml");
        fs::write(&config_path, &content).expect("write config");
        let config = HarnessConfig::from_toml(&content).expect("service config");
        Self {
            root,
            state_dir,
            config_path,
            config,
        }
    }

    /// Returns the run root.
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Returns the directory the console mutates.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Returns the config file path.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Returns the parsed config.
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Builds a suite runner from the config.
    pub fn runner(&self) -> SuiteRunner {
        runner_for(&self.config)
    }
}

/// Builds a suite runner the way the CLI does.
pub fn runner_for(config: &HarnessConfig) -> SuiteRunner {
    let registry = config.registry().expect("registry");
    let settings = RunnerSettings {
        program: config.console.binary.clone(),
        default_timeout: config.default_timeout(),
        base_ambient: config.ambient.base.clone(),
        max_parallel_operations: config.limits.max_parallel_operations,
    };
    SuiteRunner::new(Arc::new(registry), MatrixSynthesizer::new(config.synthesis_options()), settings)
}
