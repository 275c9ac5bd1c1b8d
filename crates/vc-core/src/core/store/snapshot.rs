//! Full-copy snapshots of tracked files under `versions/snapshot-<id>/`.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};
use vc_domain::{hash_bytes, is_short_id, TrackedFile};
use walkdir::WalkDir;

use crate::core::errors::{Entity, VcError};

use super::MAX_ID_ATTEMPTS;

const SNAPSHOT_PREFIX: &str = "snapshot-";

static SNAPSHOT_NONCE: AtomicU64 = AtomicU64::new(0);

/// Produces candidate snapshot ids.
pub(crate) type IdSource = fn() -> String;

#[derive(Clone, Debug)]
pub struct SnapshotStore {
    versions_dir: PathBuf,
    next_id: IdSource,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(versions_dir: impl Into<PathBuf>) -> Self {
        Self {
            versions_dir: versions_dir.into(),
            next_id: fresh_id,
        }
    }

    #[must_use]
    pub fn path(&self, snapshot_id: &str) -> PathBuf {
        self.versions_dir
            .join(format!("{SNAPSHOT_PREFIX}{snapshot_id}"))
    }

    #[must_use]
    pub fn exists(&self, snapshot_id: &str) -> bool {
        is_short_id(snapshot_id) && self.path(snapshot_id).is_dir()
    }

    /// Copy `files` into a fresh snapshot and return its id.
    ///
    /// Files whose source no longer exists are skipped. The snapshot is
    /// assembled in a `.partial` directory and renamed into place, so a
    /// failed copy never leaves a half-written snapshot behind.
    pub fn create(&self, files: &[TrackedFile]) -> Result<String> {
        let (snapshot_id, dst) = self.mint_id()?;
        let tmp = dst.with_extension("partial");
        if tmp.exists() {
            let _ = fs::remove_dir_all(&tmp);
        }
        fs::create_dir_all(&tmp)
            .with_context(|| format!("failed to create snapshot area {}", tmp.display()))?;

        let mut copied = 0usize;
        for file in files {
            if !file.source.is_file() {
                warn!(
                    snapshot = %snapshot_id,
                    path = %file.path,
                    source = %file.source.display(),
                    "snapshot source missing; skipping"
                );
                continue;
            }
            let target = file
                .path
                .split('/')
                .fold(tmp.clone(), |path, part| path.join(part));
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::copy(&file.source, &target).with_context(|| {
                format!(
                    "failed to copy {} into snapshot {snapshot_id}",
                    file.source.display()
                )
            })?;
            copied += 1;
        }

        fs::rename(&tmp, &dst).with_context(|| {
            format!(
                "failed to move snapshot into place ({} -> {})",
                tmp.display(),
                dst.display()
            )
        })?;
        debug!(snapshot = %snapshot_id, files = copied, "snapshot created");
        Ok(snapshot_id)
    }

    /// Copy a snapshot's contents over `target`, overwriting files at the
    /// same paths. Files only present in `target` are left alone.
    ///
    /// Every destination is checked before anything is written, and files
    /// are copied next to their destination first, then renamed into place
    /// once all copies succeeded. A failed restore leaves existing files as
    /// they were.
    pub fn restore(&self, snapshot_id: &str, target: &Path) -> Result<usize> {
        if !self.exists(snapshot_id) {
            return Err(VcError::not_found(Entity::Snapshot, snapshot_id).into());
        }
        let src = self.path(snapshot_id);
        let plan = plan_restore(&src, target)?;

        for dir in &plan.dirs {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(plan.files.len());
        for (from, dest) in &plan.files {
            let tmp = partial_path(dest);
            if let Err(err) = fs::copy(from, &tmp) {
                let _ = fs::remove_file(&tmp);
                discard(&staged);
                return Err(err).with_context(|| {
                    format!("failed to restore {} -> {}", from.display(), dest.display())
                });
            }
            staged.push((tmp, dest.as_path()));
        }

        for (index, (tmp, dest)) in staged.iter().enumerate() {
            if let Err(err) = fs::rename(tmp, dest) {
                discard(&staged[index..]);
                return Err(err).with_context(|| {
                    format!("failed to move {} into place", dest.display())
                });
            }
        }
        let restored = staged.len();
        debug!(snapshot = %snapshot_id, target = %target.display(), files = restored, "snapshot restored");
        Ok(restored)
    }

    fn mint_id(&self) -> Result<(String, PathBuf)> {
        let mut last = String::new();
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = (self.next_id)();
            let path = self.path(&candidate);
            if !path.exists() && !path.with_extension("partial").exists() {
                return Ok((candidate, path));
            }
            debug!(snapshot = %candidate, "snapshot id collision; regenerating");
            last = candidate;
        }
        Err(VcError::conflict(Entity::Snapshot, last).into())
    }

    #[cfg(test)]
    pub(crate) fn with_id_source(mut self, next_id: IdSource) -> Self {
        self.next_id = next_id;
        self
    }
}

fn fresh_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let nonce = SNAPSHOT_NONCE.fetch_add(1, Ordering::Relaxed);
    hash_bytes(format!("snapshot-{nanos}-{}-{nonce}", std::process::id()).as_bytes())
}

#[derive(Default)]
struct RestorePlan {
    dirs: Vec<PathBuf>,
    files: Vec<(PathBuf, PathBuf)>,
}

/// Map every snapshot entry onto `target`, failing if a directory would
/// land on a file or a file on a directory.
fn plan_restore(src: &Path, target: &Path) -> Result<RestorePlan> {
    let mut plan = RestorePlan::default();
    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk snapshot {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .context("snapshot entry outside snapshot root")?;
        let dest = target.join(relative);
        let existing = fs::symlink_metadata(&dest).ok();
        if entry.file_type().is_dir() {
            match existing {
                Some(meta) if !meta.is_dir() => {
                    return Err(anyhow!(
                        "cannot restore directory {}: a file is in the way",
                        dest.display()
                    ));
                }
                Some(_) => {}
                None => plan.dirs.push(dest),
            }
        } else if entry.file_type().is_file() {
            if existing.is_some_and(|meta| meta.is_dir()) {
                return Err(anyhow!(
                    "cannot restore file {}: a directory is in the way",
                    dest.display()
                ));
            }
            plan.files.push((entry.path().to_path_buf(), dest));
        }
    }
    Ok(plan)
}

fn partial_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.vc-restore"))
}

fn discard(staged: &[(PathBuf, &Path)]) {
    for (tmp, _) in staged {
        let _ = fs::remove_file(tmp);
    }
}
