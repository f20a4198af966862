//! Path Resolution Utilities
//!
//! Handles conversion between stored reference paths and absolute filesystem
//! paths, and between absolute paths and the forward-slash project-relative
//! form the engine writes back into the document.

use std::path::{Component, Path, PathBuf};

/// Resolve a stored reference path to an absolute path.
///
/// Stored paths may be absolute or relative to the project base directory,
/// and may use backslash separators when written by a Windows host. Relative
/// paths are resolved against the base directory.
pub fn resolve_stored_path(base_dir: &Path, stored: &str) -> PathBuf {
    // Stored paths from Windows hosts use backslashes; treat them as
    // separators on every platform.
    let normalized = stored.replace('\\', "/");
    let path = Path::new(&normalized);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Convert an absolute path to a project-relative path.
///
/// Returns `Some(relative)` if the path is inside the project base directory,
/// `None` if it lies outside. The returned string uses forward slashes
/// regardless of host platform.
pub fn to_project_relative(base_dir: &Path, absolute: &Path) -> Option<String> {
    let canonical_base = canonical_identity(base_dir);
    let canonical_path = canonical_identity(absolute);

    canonical_path
        .strip_prefix(&canonical_base)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

/// Resolve a path to its canonical identity for deduplication.
///
/// Two references pointing at the same file through different spellings
/// (relative vs absolute, `..` hops, symlinks) resolve to the same identity.
/// If the path does not exist, its components are normalized manually so the
/// result is still stable.
///
/// On Windows, `std::fs::canonicalize` returns UNC paths (`\\?\C:\...`); the
/// prefix is stripped so identities compare cleanly against joined paths.
pub fn canonical_identity(path: &Path) -> PathBuf {
    match std::fs::canonicalize(path) {
        Ok(canonical) => strip_unc_prefix(canonical),
        Err(_) => {
            let mut result = PathBuf::new();
            for component in path.components() {
                match component {
                    Component::ParentDir => {
                        result.pop();
                    }
                    Component::CurDir => {}
                    _ => result.push(component),
                }
            }
            if result.as_os_str().is_empty() {
                path.to_path_buf()
            } else {
                result
            }
        }
    }
}

/// Strip the Windows UNC prefix (`\\?\`) from a canonicalized path.
/// On non-Windows platforms, this is a no-op.
fn strip_unc_prefix(path: PathBuf) -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let s = path.to_string_lossy();
        if let Some(stripped) = s.strip_prefix(r"\\?\") {
            return PathBuf::from(stripped);
        }
    }
    path
}
