use crate::error::LibraryError;
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::Path;

/// Exclusive lock held for the duration of one run. Two concurrent runs
/// against the same library dir would race the document promotions, so
/// the second one fails fast instead.
#[derive(Debug)]
pub struct RunLock {
    file: File,
}

pub fn acquire(lock_file: &Path) -> Result<RunLock> {
    if let Some(parent) = lock_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(lock_file)
        .with_context(|| format!("failed to open {}", lock_file.display()))?;

    file.try_lock_exclusive()
        .map_err(|_| LibraryError::Locked(lock_file.to_path_buf()))?;

    Ok(RunLock { file })
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
