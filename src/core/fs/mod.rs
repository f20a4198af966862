//! Filesystem utilities.
//!
//! This module provides the primitives the relocation executor builds on:
//! scoped validation of the target directory name, idempotent directory
//! creation, freshness-aware file copies, and a crash-tolerant JSON write
//! used by the manifest document adapter.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{GatherError, GatherResult};

// =============================================================================
// Target Directory Validation
// =============================================================================

/// Validates that a target child directory name stays inside the project tree.
///
/// The engine only ever writes under `<base>/<target_dir_name>`; a name that
/// contains traversal sequences or separators would escape that scope, so it
/// is rejected before any filesystem work happens. Rejected:
/// - Empty or whitespace-only names
/// - Path traversal sequences (`..`)
/// - Path separators (`/`, `\`)
/// - Drive letter indicators (`:`)
/// - Control characters
pub fn validate_target_dir_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("name is empty or contains only whitespace".to_string());
    }
    if trimmed.contains("..")
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains(':')
    {
        return Err("name contains path traversal characters".to_string());
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err("name contains control characters".to_string());
    }
    Ok(())
}

// =============================================================================
// Directory and Copy Primitives
// =============================================================================

/// Creates a directory and its parents if absent.
///
/// Creating an already-existing directory is not an error; concurrent callers
/// racing on the same path both succeed.
pub fn ensure_dir(path: &Path) -> GatherResult<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Copies `src` to `dest` unless the destination is already up to date.
///
/// Returns `true` when bytes were written, `false` when the existing
/// destination was at least as fresh as the source and was left untouched.
/// A destination left behind by an interrupted earlier run is only refreshed
/// when the source has been modified since.
///
/// The source is never removed or altered.
pub fn copy_if_stale(src: &Path, dest: &Path) -> GatherResult<bool> {
    if dest.exists() {
        let src_mtime = std::fs::metadata(src)?.modified()?;
        let dest_mtime = std::fs::metadata(dest)?.modified()?;
        if dest_mtime >= src_mtime {
            return Ok(false);
        }
    }
    std::fs::copy(src, dest)?;
    Ok(true)
}

// =============================================================================
// Atomic JSON Writes
// =============================================================================

/// Write bytes to `path` using an atomic replace pattern.
///
/// Implementation notes:
/// - Write to a sibling temporary file.
/// - Flush and sync the temp file.
/// - Swap into place by renaming.
/// - If the destination exists, it is first moved aside as a `.bak` file,
///   then removed.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> GatherResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = sibling_with_suffix(path, "tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    atomic_replace(path, &tmp_path)?;
    Ok(())
}

/// Write a JSON file atomically with pretty formatting.
pub fn atomic_write_json_pretty<T: serde::Serialize>(path: &Path, value: &T) -> GatherResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write_bytes(path, &bytes)
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut sibling = path.to_path_buf();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| suffix.to_string());
    sibling.set_file_name(format!("{file_name}.{suffix}"));
    sibling
}

fn atomic_replace(dest: &Path, src_tmp: &Path) -> GatherResult<()> {
    // Fast path: dest does not exist.
    if !dest.exists() {
        std::fs::rename(src_tmp, dest)?;
        return Ok(());
    }

    // Windows: rename-over-existing may fail depending on filesystem; use a
    // backup swap.
    let bak = sibling_with_suffix(dest, "bak");

    // Best-effort cleanup of stale backup.
    if bak.exists() {
        let _ = std::fs::remove_file(&bak);
    }

    std::fs::rename(dest, &bak)?;
    match std::fs::rename(src_tmp, dest) {
        Ok(()) => {
            let _ = std::fs::remove_file(&bak);
            Ok(())
        }
        Err(e) => {
            // Try to restore the old file.
            let _ = std::fs::rename(&bak, dest);
            let _ = std::fs::remove_file(src_tmp);
            Err(GatherError::IoError(e))
        }
    }
}
