use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use tracing::info;
use vc_domain::{
    normalize_tracked_path, validate_branch_name, BranchSummary, Commit, InvalidName, NameKind,
    RepoStats, TrackedFile,
};

use crate::core::errors::{Entity, VcError};
use crate::core::store::{
    BranchStore, CommitStore, FsRecordStore, RecordStore, RepoLock, SnapshotStore,
};

use super::stats::directory_size;

const META_DIR: &str = ".vc";
const VERSIONS_DIR: &str = "versions";
const BRANCHES_DIR: &str = "branches";

/// Handle to one repository: a working directory plus its `.vc/` metadata.
///
/// Every mutating operation holds the repository's [`RepoLock`] until it
/// returns; reads take no lock and may observe a concurrent writer's
/// completed record replacement but never a partial one.
pub struct Repository {
    root: PathBuf,
    meta: PathBuf,
    snapshots: SnapshotStore,
    commits: CommitStore,
    branches: BranchStore,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Open `root`, creating the metadata area (a `main` branch with empty
    /// history) when it does not exist yet.
    pub fn init(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)
            .with_context(|| format!("failed to create repository {}", root.display()))?;
        let records = Arc::new(FsRecordStore::new(root.join(META_DIR)));
        let repo = Self::with_record_store(root, records);
        repo.ensure_initialized()?;
        Ok(repo)
    }

    /// Open an existing repository directory; `NotFound` if it is missing.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(VcError::not_found(Entity::Repository, root.display().to_string()).into());
        }
        Self::init(root)
    }

    /// Build a repository whose commit and branch records live in `records`.
    /// Snapshots always live under `<root>/.vc/versions`.
    #[must_use]
    pub fn with_record_store(root: impl AsRef<Path>, records: Arc<dyn RecordStore>) -> Self {
        let root = root.as_ref().to_path_buf();
        let meta = root.join(META_DIR);
        Self {
            snapshots: SnapshotStore::new(meta.join(VERSIONS_DIR)),
            commits: CommitStore::new(records.clone()),
            branches: BranchStore::new(records),
            root,
            meta,
        }
    }

    /// Write the initial branch state if none exists.
    pub fn ensure_initialized(&self) -> Result<()> {
        if self.branches.is_initialized()? {
            return Ok(());
        }
        let _lock = self.lock()?;
        if self.branches.is_initialized()? {
            return Ok(());
        }
        for dir in [VERSIONS_DIR, BRANCHES_DIR] {
            let path = self.meta.join(dir);
            fs::create_dir_all(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
        }
        self.branches.initialize()?;
        info!(repo = %self.root.display(), "repository initialized");
        Ok(())
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn meta_dir(&self) -> &Path {
        &self.meta
    }

    fn lock(&self) -> Result<RepoLock> {
        RepoLock::acquire(&self.meta)
    }

    /// Record `files` as a new commit on the current branch.
    ///
    /// The snapshot and commit record are written before the branch record
    /// is replaced, so a failure leaves the branch as it was.
    pub fn commit(&self, message: &str, author: &str, files: &[TrackedFile]) -> Result<Commit> {
        let files = files
            .iter()
            .map(|file| -> Result<TrackedFile> {
                let path = normalize_tracked_path(&file.path).map_err(VcError::from)?;
                if file.source.exists() && !file.source.is_file() {
                    return Err(VcError::from(not_a_file(&path)).into());
                }
                Ok(TrackedFile {
                    path,
                    ..file.clone()
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let _lock = self.lock()?;
        let (branch, mut record) = self.branches.read_current()?;
        let commit = self.commits.create(
            message,
            author,
            &files,
            record.head.clone(),
            &self.snapshots,
        )?;
        record.push(commit.id.clone());
        self.branches.write_branch(&branch, &record)?;
        info!(
            commit = %commit.id,
            %branch,
            files = commit.files.len(),
            "commit created"
        );
        Ok(commit)
    }

    /// Current branch's commits, newest first, at most `limit`.
    pub fn history(&self, limit: usize) -> Result<Vec<Commit>> {
        let (branch, record) = self.branches.read_current()?;
        self.resolve_history(&branch, &record.commits, limit)
    }

    /// Like [`Repository::history`] for a named branch.
    pub fn branch_history(&self, branch: &str, limit: usize) -> Result<Vec<Commit>> {
        let record = self.branches.read_branch(branch)?;
        self.resolve_history(branch, &record.commits, limit)
    }

    fn resolve_history(&self, branch: &str, ids: &[String], limit: usize) -> Result<Vec<Commit>> {
        ids.iter()
            .rev()
            .take(limit)
            .map(|id| self.listed_commit(branch, id))
            .collect()
    }

    /// Load a commit a branch refers to; a dangling reference is corruption.
    fn listed_commit(&self, branch: &str, id: &str) -> Result<Commit> {
        self.commits.find(id)?.ok_or_else(|| {
            VcError::corruption(
                format!("branch '{branch}'"),
                format!("references missing commit '{id}'"),
            )
            .into()
        })
    }

    pub fn get_commit(&self, id: &str) -> Result<Commit> {
        self.commits.get(id)
    }

    pub fn current_branch(&self) -> Result<String> {
        self.branches.current_branch_name()
    }

    pub fn create_branch(&self, name: &str, from: Option<&str>) -> Result<String> {
        let _lock = self.lock()?;
        let created = self.branches.create_branch(name, from, &self.commits)?;
        info!(branch = %created, from = ?from, "branch created");
        Ok(created)
    }

    /// Make `name` the current branch. The working tree is left as is.
    pub fn switch_branch(&self, name: &str) -> Result<String> {
        validate_branch_name(name).map_err(VcError::from)?;
        let _lock = self.lock()?;
        let current = self.branches.switch_branch(name)?;
        info!(branch = %current, "switched branch");
        Ok(current)
    }

    pub fn list_branches(&self) -> Result<Vec<BranchSummary>> {
        self.branches.list_branches()
    }

    /// Restore a commit's snapshot onto the working tree.
    ///
    /// Branch heads and history are untouched. Files at paths the snapshot
    /// holds are overwritten; other files stay.
    pub fn revert_to(&self, commit_id: &str) -> Result<Commit> {
        let _lock = self.lock()?;
        let commit = self.commits.get(commit_id)?;
        if !self.snapshots.exists(&commit.snapshot) {
            return Err(VcError::not_found(Entity::Snapshot, commit.snapshot.clone()).into());
        }
        let restored = self.snapshots.restore(&commit.snapshot, &self.root)?;
        info!(commit = %commit.id, snapshot = %commit.snapshot, files = restored, "reverted working tree");
        Ok(commit)
    }

    pub fn stats(&self) -> Result<RepoStats> {
        let (current_branch, record) = self.branches.read_current()?;
        let total_branches = self.branches.branch_names()?.len();
        let latest_commit = match record.head.as_deref() {
            Some(head) => Some(self.listed_commit(&current_branch, head)?),
            None => None,
        };
        Ok(RepoStats {
            current_branch,
            total_commits: record.commits.len(),
            total_branches,
            latest_commit,
            repository_size_bytes: directory_size(&self.root)?,
            metadata_size_bytes: directory_size(&self.meta)?,
        })
    }

    /// Copy an already-materialized file into the working tree at `path`.
    pub fn stage(
        &self,
        path: &str,
        source: &Path,
        media_type: Option<String>,
    ) -> Result<TrackedFile> {
        let relative = normalize_tracked_path(path).map_err(VcError::from)?;
        let dest = self.working_path(&relative);
        let _lock = self.lock()?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let same_file = match (fs::canonicalize(source), fs::canonicalize(&dest)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if !same_file {
            fs::copy(source, &dest).with_context(|| {
                format!("failed to stage {} as {}", source.display(), dest.display())
            })?;
        }
        self.track(&relative, media_type)
    }

    /// Describe a file already present in the working tree.
    pub fn track(&self, path: &str, media_type: Option<String>) -> Result<TrackedFile> {
        let relative = normalize_tracked_path(path).map_err(VcError::from)?;
        let source = self.working_path(&relative);
        let metadata = fs::metadata(&source)
            .with_context(|| format!("failed to stat {}", source.display()))?;
        if !metadata.is_file() {
            return Err(VcError::from(not_a_file(&relative)).into());
        }
        let size = metadata.len();
        Ok(TrackedFile {
            path: relative,
            source,
            size,
            media_type,
        })
    }

    fn working_path(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

fn not_a_file(path: &str) -> InvalidName {
    InvalidName {
        kind: NameKind::TrackedPath,
        value: path.to_string(),
        reason: "must name a regular file",
    }
}
