//! Path-safety validation for workload persist directories
//!
//! Persist directories name mount points inside the workload
//! container, so they are validated purely lexically: the directories
//! may not exist yet and symlink resolution on the host would be
//! meaningless. A traversal string like
//! `/etc/nginx/conf.d/../../../etc/shadow` must be caught from the
//! string alone.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Error returned when a persist directory fails validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path is empty
    #[error("Empty directory path")]
    Empty,

    /// The path is not absolute
    #[error("Directory path must be absolute: {0}")]
    NotAbsolute(String),

    /// The path contains `.` or `..` segments
    #[error("Directory path contains traversal segments: {0}")]
    Traversal(String),

    /// The path falls outside the allowed persistence root
    #[error("Directory path escapes allowed root {root}: {path}")]
    OutsideRoot { path: String, root: String },
}

/// Validate a candidate persist directory against the allowed root
///
/// Rules, applied to the literal string without touching the
/// filesystem:
/// 1. The path must be non-empty and absolute.
/// 2. `.` and `..` segments are rejected outright. Mount points are
///    taken literally; a parent reference is always a traversal
///    attempt, never a spelling to resolve.
/// 3. The result must be prefixed by `allowed_root`.
///
/// Returns the validated path on success.
pub fn validate_persist_dir(path: &str, allowed_root: &Path) -> Result<PathBuf, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let candidate = Path::new(path);
    if !candidate.is_absolute() {
        return Err(PathError::NotAbsolute(path.to_string()));
    }

    let mut normalized = PathBuf::from("/");
    for component in candidate.components() {
        match component {
            Component::RootDir => {}
            Component::Normal(segment) => normalized.push(segment),
            _ => return Err(PathError::Traversal(path.to_string())),
        }
    }

    if !normalized.starts_with(allowed_root) {
        return Err(PathError::OutsideRoot {
            path: path.to_string(),
            root: allowed_root.display().to_string(),
        });
    }

    Ok(normalized)
}
