use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use vc_domain::{validate_repo_name, Commit, RepoStats};

use crate::core::errors::{Entity, VcError};

use super::repository::Repository;

const INITIAL_MESSAGE: &str = "Initial commit";
const INITIAL_AUTHOR: &str = "System";

/// Named repositories living side by side under one root directory.
#[derive(Clone, Debug)]
pub struct Registry {
    root: PathBuf,
}

/// Row returned when listing repositories.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepoSummary {
    pub name: String,
    #[serde(flatten)]
    pub stats: RepoStats,
}

impl Registry {
    /// Use `root` as the registry directory, creating it if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create repositories dir {}", root.display()))?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn repo_path(&self, name: &str) -> Result<PathBuf> {
        validate_repo_name(name).map_err(VcError::from)?;
        Ok(self.root.join(name))
    }

    /// Create and initialize a repository, then record its initial commit.
    pub fn create(&self, name: &str) -> Result<(Repository, Commit)> {
        let path = self.repo_path(name)?;
        if path.exists() {
            return Err(VcError::conflict(Entity::Repository, name).into());
        }
        let created = Self::populate(&path, |path| {
            let repo = Repository::init(path)?;
            let commit = repo.commit(INITIAL_MESSAGE, INITIAL_AUTHOR, &[])?;
            Ok((repo, commit))
        })?;
        info!(repo = %name, commit = %created.1.id, "repository created");
        Ok(created)
    }

    /// Run `init` against a directory that did not exist before; on failure
    /// the directory is removed so the name can be reused.
    fn populate<F>(path: &Path, init: F) -> Result<(Repository, Commit)>
    where
        F: FnOnce(&Path) -> Result<(Repository, Commit)>,
    {
        init(path).map_err(|err| {
            if let Err(cleanup) = fs::remove_dir_all(path) {
                warn!(
                    path = %path.display(),
                    error = %cleanup,
                    "failed to remove partially created repository"
                );
            }
            err
        })
    }

    pub fn open(&self, name: &str) -> Result<Repository> {
        let path = self.repo_path(name)?;
        if !path.is_dir() {
            return Err(VcError::not_found(Entity::Repository, name).into());
        }
        Repository::open(&path)
    }

    /// Every repository with its stats, sorted by name.
    pub fn list(&self) -> Result<Vec<RepoSummary>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("failed to list {}", self.root.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_repo_name(&name).is_err() {
                debug!(%name, "skipping directory that is not a repository name");
                continue;
            }
            names.push(name);
        }
        names.sort();

        let mut summaries = Vec::with_capacity(names.len());
        for name in names {
            let repo = self.open(&name)?;
            summaries.push(RepoSummary {
                stats: repo.stats()?,
                name,
            });
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use tempfile::tempdir;

    use super::*;
    use crate::core::errors::ErrorKind;

    #[test]
    fn failed_create_leaves_no_directory_behind() -> Result<()> {
        let temp = tempdir()?;
        let registry = Registry::new(temp.path().join("repos"))?;
        let path = registry.root().join("demo");

        let err = Registry::populate(&path, |path| {
            Repository::init(path)?;
            Err(anyhow!("disk full"))
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(!path.exists());

        let (_, initial) = registry.create("demo")?;
        assert_eq!(initial.message, INITIAL_MESSAGE);
        let err = registry.create("demo").unwrap_err();
        assert_eq!(VcError::kind_of(&err), Some(ErrorKind::Conflict));
        Ok(())
    }
}
