//! Cache store trait and the filesystem implementation.

use crate::keys::CacheKey;
use async_trait::async_trait;
use gantry_core::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// A stored cache entry.
///
/// Lifecycle: create-on-miss, read-on-hit, overwrite-on-completion when
/// contents changed.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub paths: Vec<PathBuf>,
    pub blob: Vec<u8>,
}

/// Key-value blob storage for build caches.
///
/// Restore is exact-match only: a mismatch on any key component is a
/// full miss, never a partial hit. Errors from any operation degrade the
/// caller to a cold run; they must never fail the pipeline.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Restore the entry stored under `key`, if any.
    async fn restore(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Save `blob` under `key`. A no-op when the stored content is
    /// byte-identical; otherwise an atomic replace. Last-writer-wins
    /// under concurrent saves of the same key.
    async fn save(&self, key: &CacheKey, paths: &[PathBuf], blob: &[u8]) -> Result<()>;

    /// Check whether an entry exists under `key`.
    async fn exists(&self, key: &CacheKey) -> Result<bool>;

    /// Delete the entry stored under `key`, if any.
    async fn delete(&self, key: &CacheKey) -> Result<()>;
}

/// Filesystem-backed cache store.
pub struct FilesystemStore {
    root_dir: PathBuf,
}

impl FilesystemStore {
    pub fn new(root_dir: PathBuf) -> Self {
        Self { root_dir }
    }

    fn blob_path(&self, key: &CacheKey) -> PathBuf {
        self.root_dir.join(format!("{}.blob", key.sanitized()))
    }

    fn paths_path(&self, key: &CacheKey) -> PathBuf {
        self.root_dir.join(format!("{}.paths", key.sanitized()))
    }

    /// Temp name unique per call, so concurrent saves of the same key
    /// from the same process never share a staging file.
    fn temp_path(&self, key: &CacheKey) -> PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        self.root_dir.join(format!(
            ".{}.tmp-{}-{}",
            key.sanitized(),
            std::process::id(),
            n
        ))
    }
}

fn unavailable(e: impl std::fmt::Display) -> Error {
    Error::CacheUnavailable(e.to_string())
}

fn checksum(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

#[async_trait]
impl CacheStore for FilesystemStore {
    async fn restore(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let blob_path = self.blob_path(key);
        if !blob_path.exists() {
            debug!(key = %key, "cache miss");
            return Ok(None);
        }

        let blob = tokio::fs::read(&blob_path).await.map_err(unavailable)?;
        let paths = match tokio::fs::read_to_string(self.paths_path(key)).await {
            Ok(listing) => listing.lines().map(PathBuf::from).collect(),
            Err(_) => Vec::new(),
        };

        debug!(key = %key, size_bytes = blob.len(), "cache hit");
        Ok(Some(CacheEntry {
            key: key.clone(),
            paths,
            blob,
        }))
    }

    async fn save(&self, key: &CacheKey, paths: &[PathBuf], blob: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.root_dir)
            .await
            .map_err(unavailable)?;

        let blob_path = self.blob_path(key);

        // Byte-identical content: leave the existing entry untouched.
        if let Ok(existing) = tokio::fs::read(&blob_path).await
            && checksum(&existing) == checksum(blob)
        {
            debug!(key = %key, "cache save skipped, content unchanged");
            return Ok(());
        }

        // Stage both files and rename over the final names so a truncated
        // write is never observable. The listing lands first: a reader
        // that sees the new blob sees its listing too.
        let listing = paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        let paths_tmp = self.temp_path(key);
        tokio::fs::write(&paths_tmp, listing)
            .await
            .map_err(unavailable)?;
        tokio::fs::rename(&paths_tmp, self.paths_path(key))
            .await
            .map_err(unavailable)?;

        let blob_tmp = self.temp_path(key);
        tokio::fs::write(&blob_tmp, blob).await.map_err(unavailable)?;
        tokio::fs::rename(&blob_tmp, &blob_path)
            .await
            .map_err(unavailable)?;

        debug!(key = %key, size_bytes = blob.len(), "cache entry saved");
        Ok(())
    }

    async fn exists(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.blob_path(key).exists())
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        let blob_path = self.blob_path(key);
        if blob_path.exists() {
            tokio::fs::remove_file(&blob_path)
                .await
                .map_err(unavailable)?;
        }
        let paths_path = self.paths_path(key);
        if paths_path.exists() {
            tokio::fs::remove_file(&paths_path)
                .await
                .map_err(unavailable)?;
        }
        Ok(())
    }
}

impl FilesystemStore {
    /// Default location under the system temp directory, used by the CLI
    /// when no cache directory is configured.
    pub fn default_root() -> PathBuf {
        std::env::temp_dir().join("gantry-cache")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(tag: &str) -> CacheKey {
        CacheKey::new("gantry", "linux", "test", b"lockfile contents", tag)
    }

    #[tokio::test]
    async fn test_restore_misses_on_unknown_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path().to_path_buf());
        assert!(store.restore(&key("v1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_restore_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path().to_path_buf());
        let k = key("v1");

        store
            .save(&k, &[PathBuf::from("target")], b"blob bytes")
            .await
            .unwrap();

        let entry = store.restore(&k).await.unwrap().expect("hit");
        assert_eq!(entry.blob, b"blob bytes");
        assert_eq!(entry.paths, vec![PathBuf::from("target")]);
    }

    #[tokio::test]
    async fn test_exact_match_required() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path().to_path_buf());

        store.save(&key("v1"), &[], b"blob").await.unwrap();

        // Same fingerprint, different version tag: full miss.
        assert!(store.restore(&key("v2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_changed_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path().to_path_buf());
        let k = key("v1");

        store.save(&k, &[], b"first").await.unwrap();
        store.save(&k, &[], b"second").await.unwrap();

        let entry = store.restore(&k).await.unwrap().expect("hit");
        assert_eq!(entry.blob, b"second");
    }

    #[tokio::test]
    async fn test_concurrent_saves_of_one_key_never_tear() {
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FilesystemStore::new(dir.path().to_path_buf()));
        let k = key("v1");
        let big = vec![b'a'; 64 * 1024];
        let small = vec![b'b'; 1024];

        for _ in 0..50 {
            let (s1, s2) = (store.clone(), store.clone());
            let (k1, k2) = (k.clone(), k.clone());
            let (b1, b2) = (big.clone(), small.clone());
            let first = tokio::spawn(async move { s1.save(&k1, &[], &b1).await });
            let second = tokio::spawn(async move { s2.save(&k2, &[], &b2).await });

            first.await.unwrap().unwrap();
            second.await.unwrap().unwrap();

            // Last-writer-wins: either blob is acceptable, a torn or
            // missing one is not.
            let entry = store.restore(&k).await.unwrap().expect("hit");
            assert!(
                entry.blob == big || entry.blob == small,
                "torn blob: len={}",
                entry.blob.len()
            );
        }
    }

    #[tokio::test]
    async fn test_delete_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path().to_path_buf());
        let k = key("v1");

        store.save(&k, &[], b"blob").await.unwrap();
        assert!(store.exists(&k).await.unwrap());

        store.delete(&k).await.unwrap();
        assert!(!store.exists(&k).await.unwrap());
    }
}
