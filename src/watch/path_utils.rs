// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::Path;

use crate::watch::patterns::normalize_pattern;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
/// - Relative input paths are taken to be root-relative already.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if path.is_relative() {
        return Some(normalize_pattern(&path.to_string_lossy()));
    }

    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    // macOS reports /private/var/... for /var/...; deleted files cannot be
    // canonicalized, so fall back to canonicalizing the parent.
    let root_canon = root.canonicalize().ok()?;
    let path_canon = path.canonicalize().ok().or_else(|| {
        let parent = path.parent()?.canonicalize().ok()?;
        Some(parent.join(path.file_name()?))
    })?;

    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}
