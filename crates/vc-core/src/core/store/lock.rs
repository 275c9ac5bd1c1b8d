use std::{
    fs::{self, File, OpenOptions},
    path::Path,
};

use anyhow::{Context, Result};
use fs4::FileExt;
use tracing::trace;

const LOCK_FILENAME: &str = "lock";

/// Exclusive advisory lock serializing writers of one repository.
///
/// Held for the duration of every mutating operation and released on drop.
/// The lock is per open file, so it serializes threads of one process as
/// well as separate processes.
#[derive(Debug)]
pub struct RepoLock {
    file: File,
}

impl RepoLock {
    pub fn acquire(meta_dir: &Path) -> Result<Self> {
        fs::create_dir_all(meta_dir)
            .with_context(|| format!("failed to create {}", meta_dir.display()))?;
        let path = meta_dir.join(LOCK_FILENAME);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("failed to open repository lock {}", path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("failed to lock {}", path.display()))?;
        trace!(lock = %path.display(), "repository lock acquired");
        Ok(Self { file })
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
