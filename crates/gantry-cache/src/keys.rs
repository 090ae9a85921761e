//! Cache key construction.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A deterministic cache key.
///
/// Pure function of its inputs: equal inputs always yield an equal key.
/// The fingerprint is a SHA-256 over the dependency-lock contents; the
/// version tag is a manual cache-format epoch allowing forced
/// invalidation without touching the fingerprint input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub namespace: String,
    pub os: String,
    pub job_name: String,
    pub fingerprint: String,
    pub version_tag: String,
}

impl CacheKey {
    /// Build a key from explicit inputs. No environment lookups happen
    /// here; the caller supplies the os tag and lock contents.
    pub fn new(
        namespace: impl Into<String>,
        os: impl Into<String>,
        job_name: impl Into<String>,
        lock_contents: &[u8],
        version_tag: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            os: os.into(),
            job_name: job_name.into(),
            fingerprint: fingerprint(lock_contents),
            version_tag: version_tag.into(),
        }
    }

    /// Render the key for use as a store filename.
    pub fn sanitized(&self) -> String {
        self.to_string()
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                _ => c,
            })
            .collect()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}",
            self.namespace, self.os, self.job_name, self.fingerprint, self.version_tag
        )
    }
}

/// SHA-256 over the full contents of the dependency-lock artifact.
pub fn fingerprint(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    hex::encode(hasher.finalize())
}
