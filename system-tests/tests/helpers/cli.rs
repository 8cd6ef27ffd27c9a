// system-tests/tests/helpers/cli.rs
// ============================================================================
// Module: CLI Helpers
// Description: Locates and runs the opmatrix binary.
// Purpose: Let workflow suites drive the real CLI process.
// Dependencies: std::process
// ============================================================================

//! The `opmatrix` binary lives in another package, so cargo does not hand
//! its path to these tests. It is looked up next to the test executable and
//! built once on demand when missing.

use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::sync::OnceLock;

/// Returns the opmatrix binary, building it on first use when needed.
pub fn cli_binary() -> Result<PathBuf, String> {
    static BINARY: OnceLock<Result<PathBuf, String>> = OnceLock::new();
    BINARY
        .get_or_init(|| {
            let profile = profile_dir()?;
            let binary = profile.join(format!("opmatrix{}", std::env::consts::EXE_SUFFIX));
            if binary.is_file() {
                return Ok(binary);
            }
            build(&profile)?;
            if binary.is_file() {
                Ok(binary)
            } else {
                Err(format!("{} missing after build", binary.display()))
            }
        })
        .clone()
}

/// Runs the CLI with a clean log filter.
pub fn run_cli<I, S>(binary: &Path, args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(binary)
        .args(args)
        .env_remove("OPMATRIX_LOG")
        .output()
        .map_err(|err| format!("run {} failed: {err}", binary.display()))
}

/// Cargo profile directory holding the current test executable.
fn profile_dir() -> Result<PathBuf, String> {
    let exe = std::env::current_exe().map_err(|err| format!("current exe: {err}"))?;
    exe.parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .ok_or_else(|| format!("no profile dir above {}", exe.display()))
}

/// Builds the CLI into the profile's target directory.
fn build(profile: &Path) -> Result<(), String> {
    let target_dir = profile.parent().ok_or("profile dir has no parent")?;
    let mut command = Command::new(std::env::var_os("CARGO").unwrap_or_else(|| "cargo".into()));
    command.args(["build", "-p", "opmatrix-cli", "--bin", "opmatrix", "--target-dir"]);
    command.arg(target_dir);
    if profile.file_name().is_some_and(|name| name == "release") {
        command.arg("--release");
    }
    let output = command.output().map_err(|err| format!("spawn cargo build: {err}"))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(format!("cargo build failed: {}", String::from_utf8_lossy(&output.stderr)))
    }
}
