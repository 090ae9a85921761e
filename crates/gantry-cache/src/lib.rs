//! Build cache for Gantry.
//!
//! Deterministic key construction, tar+zstd archiving of cached paths,
//! and a key-value blob store with exact-match restore semantics.

pub mod archiver;
pub mod keys;
pub mod store;

pub use archiver::{create_archive, extract_archive};
pub use keys::CacheKey;
pub use store::{CacheEntry, CacheStore, FilesystemStore};
