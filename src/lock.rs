//! File-based locking for single-writer safety.
//!
//! fs2 advisory lock on `<dir>/schemastore.lock`, taken for the lifetime of a
//! file-backed SchemaStore. A second writer fails fast with StoreError::Locked.
//! Lock is released on Drop.

use fs2::FileExt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::consts::LOCK_FILE;
use crate::error::{Result, StoreError};

pub struct LockGuard {
    file: std::fs::File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

pub fn lock_file_path(dir: &Path) -> PathBuf {
    dir.join(LOCK_FILE)
}

/// Try to take the exclusive lock. Returns StoreError::Locked if someone holds it.
pub fn try_acquire_exclusive_lock(dir: &Path) -> Result<LockGuard> {
    let path = lock_file_path(dir);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)?;
    if file.try_lock_exclusive().is_err() {
        return Err(StoreError::Locked(path));
    }
    Ok(LockGuard { file, path })
}
