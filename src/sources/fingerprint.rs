//! Content fingerprints.

use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic digest of fetched content.
///
/// Used purely for equality testing between checks; two fetches with the
/// same bytes always produce the same fingerprint.
///
/// # Examples
///
/// ```rust
/// use config_refresher::sources::Fingerprint;
///
/// let a = Fingerprint::of(b"port: 8080");
/// let b = Fingerprint::of(b"port: 8080");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a byte sequence (lowercase hex SHA-256).
    pub fn of(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        Self(format!("{digest:x}"))
    }

    /// The textual digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A short prefix of the digest for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
