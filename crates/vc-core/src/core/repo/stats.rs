use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Total bytes of regular files under `dir`; zero when it does not exist.
pub(crate) fn directory_size(dir: &Path) -> Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut total = 0u64;
    for entry in WalkDir::new(dir) {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        if entry.file_type().is_file() {
            total += entry
                .metadata()
                .with_context(|| format!("failed to stat {}", entry.path().display()))?
                .len();
        }
    }
    Ok(total)
}
