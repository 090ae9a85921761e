//! Packing cached paths into zstd-compressed tar blobs.

use gantry_core::Result;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Pack paths into a zstd-compressed tar archive.
///
/// Relative paths are resolved against `base_dir` and stored under their
/// requested names; missing paths are skipped so a cold workspace can
/// still produce an archive of whatever exists.
pub fn create_archive<W: Write>(writer: W, paths: &[PathBuf], base_dir: &Path) -> Result<()> {
    let mut encoder = zstd::stream::write::Encoder::new(writer, 3)
        .map_err(|e| gantry_core::Error::Internal(format!("zstd init failed: {}", e)))?;
    {
        let mut builder = tar::Builder::new(&mut encoder);
        for p in paths {
            let abs_path = if p.is_absolute() {
                p.clone()
            } else {
                base_dir.join(p)
            };
            if !abs_path.exists() {
                continue;
            }
            let name = if p.is_absolute() {
                p.strip_prefix(base_dir).unwrap_or(p)
            } else {
                p.as_path()
            };

            if abs_path.is_dir() {
                builder.append_dir_all(name, &abs_path).map_err(|e| {
                    gantry_core::Error::Internal(format!("failed to pack dir: {}", e))
                })?;
            } else {
                builder.append_path_with_name(&abs_path, name).map_err(|e| {
                    gantry_core::Error::Internal(format!("failed to pack file: {}", e))
                })?;
            }
        }
        builder
            .finish()
            .map_err(|e| gantry_core::Error::Internal(format!("failed to finish tar: {}", e)))?;
    }
    encoder
        .finish()
        .map_err(|e| gantry_core::Error::Internal(format!("zstd finish failed: {}", e)))?;
    Ok(())
}

/// Unpack an archive produced by [`create_archive`] into `dest`.
pub fn extract_archive<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let decoder = zstd::stream::read::Decoder::new(reader)
        .map_err(|e| gantry_core::Error::Internal(format!("failed to create decoder: {}", e)))?;
    let mut archive = tar::Archive::new(decoder);
    archive
        .unpack(dest)
        .map_err(|e| gantry_core::Error::Internal(format!("failed to unpack archive: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_roundtrip() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();

        std::fs::create_dir_all(src.path().join("target/debug")).unwrap();
        std::fs::write(src.path().join("target/debug/marker"), b"cached bytes").unwrap();

        let mut blob = Vec::new();
        create_archive(&mut blob, &[PathBuf::from("target")], src.path()).unwrap();
        assert!(!blob.is_empty());

        extract_archive(blob.as_slice(), dest.path()).unwrap();
        let restored = std::fs::read(dest.path().join("target/debug/marker")).unwrap();
        assert_eq!(restored, b"cached bytes");
    }

    #[test]
    fn test_missing_paths_are_skipped() {
        let src = tempfile::tempdir().unwrap();
        let mut blob = Vec::new();
        create_archive(&mut blob, &[PathBuf::from("does-not-exist")], src.path()).unwrap();
    }
}
