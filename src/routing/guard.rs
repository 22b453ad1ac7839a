//! Path containment guard
//!
//! Canonicalizes candidate file paths and rejects anything that escapes the
//! configured root. Runs before any file-existence check so traversal
//! attempts never reach the handler-loading stage.

use crate::engine::error::RouteError;
use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` segments lexically, without touching the filesystem.
///
/// Returns `None` when the path climbs above its own root, which is always
/// an escape attempt for request-derived paths.
pub fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            other => out.push(other),
        }
    }
    Some(out)
}

/// Verify that `candidate` stays inside `root` and return its normalized form.
///
/// The check is path-segment-aware: `/api-root-evil` is not contained in
/// `/api-root`. For paths that exist on disk, the canonical (symlink-resolved)
/// form is re-checked against the canonical root.
pub fn ensure_contained(root: &Path, candidate: &Path) -> Result<PathBuf, RouteError> {
    let normalized = normalize(candidate).ok_or(RouteError::ForbiddenPath)?;

    if !normalized.starts_with(root) {
        return Err(RouteError::ForbiddenPath);
    }

    // Symlinks can only be resolved once the file exists. The lexical check
    // above already rejected traversal for the not-yet-existing case.
    if normalized.exists() {
        let root_canonical = root.canonicalize().map_err(|_| RouteError::ForbiddenPath)?;
        let candidate_canonical = normalized
            .canonicalize()
            .map_err(|_| RouteError::ForbiddenPath)?;
        if !candidate_canonical.starts_with(&root_canonical) {
            return Err(RouteError::ForbiddenPath);
        }
    }

    Ok(normalized)
}
