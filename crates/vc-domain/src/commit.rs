use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::hash::hash_bytes;

/// Immutable commit record, persisted as `versions/<id>.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    pub message: String,
    pub author: String,
    /// RFC 3339 timestamp, stored verbatim.
    pub timestamp: String,
    /// Id of the snapshot holding the tracked files.
    pub snapshot: String,
    pub files: Vec<FileEntry>,
    /// Head of the branch this commit was appended to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl Commit {
    /// Derive the commit id from the fields that make a commit unique in time.
    #[must_use]
    pub fn derive_id(timestamp: &str, message: &str, author: &str) -> String {
        hash_bytes(format!("{timestamp}-{message}-{author}").as_bytes())
    }
}

/// Per-file metadata recorded in a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    /// Content fingerprint; `None` when the source was missing at commit time.
    pub hash: Option<String>,
    pub size: u64,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

/// A file handed to the engine for committing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedFile {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    /// Where the bytes currently live.
    pub source: PathBuf,
    pub size: u64,
    pub media_type: Option<String>,
}
