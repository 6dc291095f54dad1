//! Filesystem helpers for job scratch space.
//!
//! Removal helpers treat "already gone" as success so callers can clean up
//! without first checking what exists.

use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;

use crate::error::MediaResult;

/// Create `dir` and any missing parents.
pub async fn ensure_dir(dir: impl AsRef<Path>) -> MediaResult<()> {
    fs::create_dir_all(dir.as_ref()).await?;
    Ok(())
}

/// Remove a file. Returns `Ok(false)` if it did not exist.
pub async fn remove_file_if_exists(path: impl AsRef<Path>) -> MediaResult<bool> {
    match fs::remove_file(path.as_ref()).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Remove a directory tree. Returns `Ok(false)` if it did not exist.
pub async fn remove_dir_if_exists(path: impl AsRef<Path>) -> MediaResult<bool> {
    match fs::remove_dir_all(path.as_ref()).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
