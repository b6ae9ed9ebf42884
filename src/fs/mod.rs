// src/fs/mod.rs

//! Output-side filesystem helpers.

use std::io::ErrorKind;
use std::path::Path;

use crate::errors::{AssetflowError, Result};

/// Write `contents` to `path`, creating parent directories.
///
/// Skips the write when the file already holds identical bytes so that
/// unchanged outputs keep their modification time. Returns whether the file
/// was written.
pub async fn write_if_changed(path: &Path, contents: &[u8]) -> Result<bool> {
    match tokio::fs::read(path).await {
        Ok(existing) if blake3::hash(&existing) == blake3::hash(contents) => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(AssetflowError::io_at(path, e)),
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AssetflowError::io_at(parent, e))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| AssetflowError::io_at(path, e))?;
    Ok(true)
}

/// Recursively delete `dir`. A directory that does not exist is not an
/// error. Returns whether anything was removed.
pub async fn remove_dir_if_exists(dir: &Path) -> Result<bool> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AssetflowError::io_at(dir, e)),
    }
}
