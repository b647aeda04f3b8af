//! File-based exclusive lock guarding a single writer per relation
//! (spec §5, "Relation exclusively owns both page files for its
//! lifetime"). Grounded in the teacher's `fs2`-backed `LockGuard`, trimmed
//! to the one mode this store needs: concurrent readers are out of scope.
//!
//! Lock file path: `<name>.lock`. Released on `Drop`.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

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

/// Acquire an exclusive lock on `lock_path`, blocking until it is free.
pub fn acquire_exclusive_lock(lock_path: &Path) -> Result<LockGuard> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(lock_path)
        .with_context(|| format!("open lock file {}", lock_path.display()))?;
    file.lock_exclusive()
        .with_context(|| format!("lock_exclusive {}", lock_path.display()))?;
    Ok(LockGuard {
        file,
        path: lock_path.to_path_buf(),
    })
}
