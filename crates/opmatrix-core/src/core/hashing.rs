// crates/opmatrix-core/src/core/hashing.rs
// ============================================================================
// Module: opmatrix Canonical Hashing
// Description: RFC 8785 JSON canonicalization and SHA-256 digests.
// Purpose: Give synthesized matrices a stable fingerprint for cross-version diffs.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Matrices are hashed over their RFC 8785 (JCS) canonical JSON, so two
//! harness builds that synthesize the same cases produce the same digest.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Digest
// ============================================================================

/// Lowercase hex SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Digests raw bytes.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure to fingerprint a value.
#[derive(Debug, Error)]
pub enum HashError {
    /// The value could not be rendered as canonical JSON.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

/// Fingerprints the RFC 8785 canonical JSON form of a value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when the value does not serialize.
pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> Result<Fingerprint, HashError> {
    let canonical =
        serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))?;
    Ok(Fingerprint::of_bytes(&canonical))
}
