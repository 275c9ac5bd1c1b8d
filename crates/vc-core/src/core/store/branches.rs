use std::{collections::HashSet, sync::Arc};

use anyhow::Result;
use tracing::warn;
use vc_domain::{validate_branch_name, BranchRecord, BranchSummary, DEFAULT_BRANCH};

use crate::core::errors::{Entity, ErrorKind, VcError};

use super::{read_json, write_json, CommitStore, RecordStore};

const HEAD_KEY: &str = "HEAD";
const BRANCHES_PREFIX: &str = "branches/";
const BRANCH_SUFFIX: &str = ".json";

/// Named branch pointers plus the current-branch indicator.
#[derive(Clone)]
pub struct BranchStore {
    records: Arc<dyn RecordStore>,
}

impl std::fmt::Debug for BranchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchStore").finish_non_exhaustive()
    }
}

fn branch_key(name: &str) -> String {
    format!("{BRANCHES_PREFIX}{name}{BRANCH_SUFFIX}")
}

impl BranchStore {
    #[must_use]
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Whether the store holds any branch state at all.
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.records.exists(HEAD_KEY)? || !self.records.list(BRANCHES_PREFIX)?.is_empty())
    }

    /// Write the `main` branch and point HEAD at it.
    pub(crate) fn initialize(&self) -> Result<()> {
        self.write_branch(DEFAULT_BRANCH, &BranchRecord::empty())?;
        self.set_current_branch_name(DEFAULT_BRANCH)
    }

    pub fn current_branch_name(&self) -> Result<String> {
        let Some(bytes) = self.records.get(HEAD_KEY)? else {
            warn!("HEAD missing; falling back to '{DEFAULT_BRANCH}'");
            return Ok(DEFAULT_BRANCH.to_string());
        };
        let name = String::from_utf8(bytes)
            .map_err(|err| VcError::corruption("HEAD", err))?
            .trim()
            .to_string();
        validate_branch_name(&name).map_err(|err| VcError::corruption("HEAD", err))?;
        Ok(name)
    }

    pub fn set_current_branch_name(&self, name: &str) -> Result<()> {
        validate_branch_name(name).map_err(VcError::from)?;
        self.records.put(HEAD_KEY, name.as_bytes())
    }

    pub fn branch_exists(&self, name: &str) -> Result<bool> {
        if validate_branch_name(name).is_err() {
            return Ok(false);
        }
        self.records.exists(&branch_key(name))
    }

    pub fn read_branch(&self, name: &str) -> Result<BranchRecord> {
        validate_branch_name(name).map_err(VcError::from)?;
        let record: BranchRecord = read_json(self.records.as_ref(), &branch_key(name))?
            .ok_or_else(|| VcError::not_found(Entity::Branch, name))?;
        if !record.is_consistent() {
            return Err(VcError::corruption(
                format!("branch '{name}'"),
                "head does not match the last commit",
            )
            .into());
        }
        Ok(record)
    }

    pub fn write_branch(&self, name: &str, record: &BranchRecord) -> Result<()> {
        validate_branch_name(name).map_err(VcError::from)?;
        write_json(self.records.as_ref(), &branch_key(name), record)
    }

    pub fn read_current(&self) -> Result<(String, BranchRecord)> {
        let name = self.current_branch_name()?;
        let record = self.read_branch(&name).map_err(|err| {
            if VcError::kind_of(&err) == Some(ErrorKind::NotFound) {
                VcError::corruption("HEAD", format!("names missing branch '{name}'")).into()
            } else {
                err
            }
        })?;
        Ok((name, record))
    }

    /// Create `name` from the current branch.
    ///
    /// Without `from`, the new branch copies the current branch's history.
    /// With `from`, the history is the parent chain ending at `from`, which
    /// must be reachable from the current head.
    pub fn create_branch(
        &self,
        name: &str,
        from: Option<&str>,
        commits: &CommitStore,
    ) -> Result<String> {
        validate_branch_name(name).map_err(VcError::from)?;
        if self.branch_exists(name)? {
            return Err(VcError::conflict(Entity::Branch, name).into());
        }
        let (current, record) = self.read_current()?;
        let record = match from {
            None => record,
            Some(fork_point) => {
                let ancestors = ancestry(&current, record.head.as_deref(), commits)?;
                let Some(position) = ancestors.iter().position(|id| id == fork_point) else {
                    return Err(VcError::not_found(Entity::Commit, fork_point).into());
                };
                let mut history: Vec<String> = ancestors[position..].to_vec();
                history.reverse();
                BranchRecord::from_commits(history)
            }
        };
        self.write_branch(name, &record)?;
        Ok(name.to_string())
    }

    /// Point HEAD at an existing branch. The working tree is not touched.
    pub fn switch_branch(&self, name: &str) -> Result<String> {
        if !self.branch_exists(name)? {
            return Err(VcError::not_found(Entity::Branch, name).into());
        }
        self.set_current_branch_name(name)?;
        Ok(name.to_string())
    }

    pub fn branch_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for key in self.records.list(BRANCHES_PREFIX)? {
            let Some(name) = key
                .strip_prefix(BRANCHES_PREFIX)
                .and_then(|rest| rest.strip_suffix(BRANCH_SUFFIX))
            else {
                continue;
            };
            if validate_branch_name(name).is_ok() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn list_branches(&self) -> Result<Vec<BranchSummary>> {
        let current = self.current_branch_name()?;
        let mut summaries = Vec::new();
        for name in self.branch_names()? {
            let record = self.read_branch(&name)?;
            summaries.push(BranchSummary {
                is_current: name == current,
                commit_count: record.commits.len(),
                head: record.head,
                name,
            });
        }
        Ok(summaries)
    }
}

/// Walk parent links from `head`, newest first.
fn ancestry(branch: &str, head: Option<&str>, commits: &CommitStore) -> Result<Vec<String>> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = head.map(str::to_string);
    while let Some(id) = cursor {
        if !seen.insert(id.clone()) {
            return Err(VcError::corruption(
                format!("branch '{branch}'"),
                format!("parent chain loops at commit '{id}'"),
            )
            .into());
        }
        let Some(commit) = commits.find(&id)? else {
            return Err(VcError::corruption(
                format!("branch '{branch}'"),
                format!("parent chain references missing commit '{id}'"),
            )
            .into());
        };
        cursor = commit.parent;
        chain.push(id);
    }
    Ok(chain)
}
