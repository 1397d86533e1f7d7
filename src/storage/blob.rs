//! Atomic artifact files and content hashing
//!
//! Derived artifacts (lexical snapshot, vector index, id mapping) are written
//! to a `.tmp` sibling, synced, then renamed over the target, so a reader never
//! observes a half-written file.

use crate::error::{Result, SiftError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Payloads at or above this size are zstd-compressed by [`write_blob`]
pub const COMPRESSION_THRESHOLD: usize = 1024;

/// Content hash used as the candidate identity (BLAKE3, 64 hex chars)
pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Atomically replace `path` with `data`
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let staged = stage_atomic(path, data)?;
    commit_staged(&staged, path)
}

/// Write and sync `data` to the `.tmp` sibling of `path` without touching
/// `path` itself. Returns the staged file for [`commit_staged`].
pub fn stage_atomic(path: &Path, data: &[u8]) -> Result<PathBuf> {
    let parent = path
        .parent()
        .ok_or_else(|| SiftError::Config(format!("Invalid artifact path: {}", path.display())))?;
    fs::create_dir_all(parent).map_err(|e| SiftError::Io {
        source: e,
        context: format!("Failed to create parent directory: {}", parent.display()),
    })?;

    let temp_path = temp_path(path);
    let mut file = fs::File::create(&temp_path).map_err(|e| SiftError::Io {
        source: e,
        context: format!("Failed to create temp file: {}", temp_path.display()),
    })?;
    file.write_all(data).map_err(|e| SiftError::Io {
        source: e,
        context: format!("Failed to write temp file: {}", temp_path.display()),
    })?;
    file.sync_all().map_err(|e| SiftError::Io {
        source: e,
        context: format!("Failed to sync temp file: {}", temp_path.display()),
    })?;

    Ok(temp_path)
}

/// Rename a staged file over its target
pub fn commit_staged(staged: &Path, path: &Path) -> Result<()> {
    fs::rename(staged, path).map_err(|e| SiftError::Io {
        source: e,
        context: format!(
            "Failed to rename temp file to final location: {} -> {}",
            staged.display(),
            path.display()
        ),
    })
}

/// Write a blob, compressing it with zstd when it is large enough.
/// Returns whether the payload was compressed.
pub fn write_blob(path: &Path, data: &[u8]) -> Result<bool> {
    if data.len() >= COMPRESSION_THRESHOLD {
        let compressed = zstd::encode_all(data, 3).map_err(|e| SiftError::Io {
            source: e,
            context: "Failed to compress blob data".to_string(),
        })?;
        write_atomic(path, &compressed)?;
        Ok(true)
    } else {
        write_atomic(path, data)?;
        Ok(false)
    }
}

/// Read a blob written by [`write_blob`]. `Ok(None)` when the file is absent.
pub fn read_blob(path: &Path) -> Result<Option<Vec<u8>>> {
    if !path.exists() {
        return Ok(None);
    }

    let data = fs::read(path).map_err(|e| SiftError::Io {
        source: e,
        context: format!("Failed to read blob: {}", path.display()),
    })?;

    // Try to decompress (if it fails, assume it wasn't compressed)
    match zstd::decode_all(&data[..]) {
        Ok(decompressed) => Ok(Some(decompressed)),
        Err(_) => Ok(Some(data)),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
