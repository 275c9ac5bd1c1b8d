use serde::{Deserialize, Serialize};

use crate::commit::Commit;

/// Diagnostic aggregate for a repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoStats {
    pub current_branch: String,
    /// Commits on the current branch.
    pub total_commits: usize,
    pub total_branches: usize,
    pub latest_commit: Option<Commit>,
    /// Every regular file under the repository root, metadata included.
    pub repository_size_bytes: u64,
    pub metadata_size_bytes: u64,
}
