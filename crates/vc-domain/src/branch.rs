use serde::{Deserialize, Serialize};

/// Branch created when a repository is initialized.
pub const DEFAULT_BRANCH: &str = "main";

/// Branch pointer persisted as `branches/<name>.json`.
///
/// `head` is `None` only while `commits` is empty; otherwise it equals the
/// last element of `commits`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRecord {
    pub commits: Vec<String>,
    pub head: Option<String>,
}

impl BranchRecord {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a record whose head is the last of `commits`.
    #[must_use]
    pub fn from_commits(commits: Vec<String>) -> Self {
        let head = commits.last().cloned();
        Self { commits, head }
    }

    /// Append a commit and move the head to it.
    pub fn push(&mut self, commit_id: String) {
        self.head = Some(commit_id.clone());
        self.commits.push(commit_id);
    }

    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.head.as_ref() == self.commits.last()
    }
}

/// Row returned when listing branches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchSummary {
    pub name: String,
    pub is_current: bool,
    pub commit_count: usize,
    pub head: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_keeps_head_on_last_commit() {
        let mut record = BranchRecord::empty();
        assert!(record.is_consistent());
        record.push("c1".to_string());
        record.push("c2".to_string());
        assert_eq!(record.head.as_deref(), Some("c2"));
        assert_eq!(record.commits, vec!["c1", "c2"]);
        assert!(record.is_consistent());
    }

    #[test]
    fn detects_head_drift() {
        let record = BranchRecord {
            commits: vec!["c1".to_string()],
            head: None,
        };
        assert!(!record.is_consistent());
        assert!(BranchRecord::from_commits(vec!["c1".to_string()]).is_consistent());
    }

    #[test]
    fn serializes_null_head() {
        let raw = serde_json::to_string(&BranchRecord::empty()).unwrap();
        assert_eq!(raw, r#"{"commits":[],"head":null}"#);
    }
}
