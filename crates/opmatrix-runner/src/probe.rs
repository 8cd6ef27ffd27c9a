// crates/opmatrix-runner/src/probe.rs
// ============================================================================
// Module: opmatrix File Probe
// Description: Side-effect probe over a directory tree.
// Purpose: Detect mutations a dry run must not leave behind.
// Dependencies: opmatrix-core
// ============================================================================

//! ## Overview
//! [`FileProbe`] walks a directory, hashes every regular file with SHA-256
//! and fingerprints the sorted `relative path -> digest` map. Any created,
//! removed or rewritten file changes the observation. Symlinks are recorded
//! by target path and never followed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use opmatrix_core::Fingerprint;
use opmatrix_core::OperationName;
use opmatrix_core::ProbeError;
use opmatrix_core::ProbeState;
use opmatrix_core::SideEffectProbe;
use opmatrix_core::fingerprint;

// ============================================================================
// SECTION: Probe
// ============================================================================

/// Fingerprints the contents of a directory tree.
#[derive(Debug, Clone)]
pub struct FileProbe {
    /// Directory observed.
    root: PathBuf,
}

impl FileProbe {
    /// Creates a probe rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the observed directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Collects the digest map for the tree.
    fn listing(&self) -> Result<BTreeMap<String, String>, ProbeError> {
        let mut entries = BTreeMap::new();
        if !self.root.exists() {
            return Ok(entries);
        }
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let read = fs::read_dir(&dir).map_err(|err| observe_error(&dir, &err))?;
            for entry in read {
                let entry = entry.map_err(|err| observe_error(&dir, &err))?;
                let path = entry.path();
                let file_type = entry.file_type().map_err(|err| observe_error(&path, &err))?;
                let key = path
                    .strip_prefix(&self.root)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .into_owned();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_symlink() {
                    let target = fs::read_link(&path).map_err(|err| observe_error(&path, &err))?;
                    entries.insert(key, format!("link:{}", target.display()));
                } else {
                    let bytes = fs::read(&path).map_err(|err| observe_error(&path, &err))?;
                    entries.insert(key, Fingerprint::of_bytes(&bytes).to_string());
                }
            }
        }
        Ok(entries)
    }
}

impl SideEffectProbe for FileProbe {
    fn observe(&self, _operation: &OperationName) -> Result<ProbeState, ProbeError> {
        let listing = self.listing()?;
        let digest = fingerprint(&listing).map_err(|err| ProbeError::Observe(err.to_string()))?;
        Ok(ProbeState::new(digest.as_str()))
    }
}

/// Formats an io failure for a path.
fn observe_error(path: &Path, err: &std::io::Error) -> ProbeError {
    ProbeError::Observe(format!("{}: {err}", path.display()))
}
