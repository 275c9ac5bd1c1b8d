use std::sync::Arc;

use anyhow::{Context, Result};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::debug;
use vc_domain::{hash_file, is_short_id, Commit, FileEntry, TrackedFile};

use crate::core::errors::{Entity, VcError};

use super::{read_json, write_json, RecordStore, SnapshotStore, MAX_ID_ATTEMPTS};

const VERSIONS_PREFIX: &str = "versions/";

/// Immutable commit records keyed by id. There is no update or delete.
#[derive(Clone)]
pub struct CommitStore {
    records: Arc<dyn RecordStore>,
    clock: Clock,
}

/// Produces commit timestamps.
pub(crate) type Clock = fn() -> Result<String>;

impl std::fmt::Debug for CommitStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitStore").finish_non_exhaustive()
    }
}

fn commit_key(id: &str) -> String {
    format!("{VERSIONS_PREFIX}{id}.json")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("failed to format commit timestamp")
}

impl CommitStore {
    #[must_use]
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self {
            records,
            clock: now_rfc3339,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Snapshot `files` and persist a new commit record.
    ///
    /// The id hashes `(timestamp, message, author)`; if a record with that id
    /// already exists a fresh timestamp is taken.
    pub fn create(
        &self,
        message: &str,
        author: &str,
        files: &[TrackedFile],
        parent: Option<String>,
        snapshots: &SnapshotStore,
    ) -> Result<Commit> {
        let (id, timestamp) = self.mint_id(message, author)?;
        let snapshot = snapshots.create(files)?;
        let snapshot_root = snapshots.path(&snapshot);

        // Fingerprints come from the snapshot copy, which later writers to
        // the working tree cannot change.
        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let copy = file
                .path
                .split('/')
                .fold(snapshot_root.clone(), |path, part| path.join(part));
            let hash = if copy.is_file() {
                Some(hash_file(&copy)?)
            } else {
                None
            };
            entries.push(FileEntry {
                path: file.path.clone(),
                hash,
                size: file.size,
                media_type: file.media_type.clone(),
            });
        }

        let commit = Commit {
            id,
            message: message.to_string(),
            author: author.to_string(),
            timestamp,
            snapshot,
            files: entries,
            parent,
        };
        write_json(self.records.as_ref(), &commit_key(&commit.id), &commit)?;
        debug!(commit = %commit.id, snapshot = %commit.snapshot, "commit recorded");
        Ok(commit)
    }

    /// Load a commit; `NotFound` for unknown ids.
    pub fn get(&self, id: &str) -> Result<Commit> {
        self.find(id)?
            .ok_or_else(|| VcError::not_found(Entity::Commit, id).into())
    }

    pub fn find(&self, id: &str) -> Result<Option<Commit>> {
        if !is_short_id(id) {
            return Ok(None);
        }
        let Some(commit) = read_json::<Commit>(self.records.as_ref(), &commit_key(id))? else {
            return Ok(None);
        };
        if commit.id != id {
            return Err(VcError::corruption(
                format!("commit '{id}'"),
                format!("record carries id '{}'", commit.id),
            )
            .into());
        }
        Ok(Some(commit))
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        if !is_short_id(id) {
            return Ok(false);
        }
        self.records.exists(&commit_key(id))
    }

    fn mint_id(&self, message: &str, author: &str) -> Result<(String, String)> {
        let mut last = String::new();
        for _ in 0..MAX_ID_ATTEMPTS {
            let timestamp = (self.clock)()?;
            let id = Commit::derive_id(&timestamp, message, author);
            if !self.records.exists(&commit_key(&id))? {
                return Ok((id, timestamp));
            }
            debug!(commit = %id, "commit id collision; regenerating");
            last = id;
        }
        Err(VcError::conflict(Entity::Commit, last).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;
    use crate::core::store::MemoryRecordStore;
    use std::fs;
    use tempfile::tempdir;

    fn stores(root: &std::path::Path) -> (CommitStore, SnapshotStore) {
        (
            CommitStore::new(Arc::new(MemoryRecordStore::new())),
            SnapshotStore::new(root.join("versions")),
        )
    }

    #[test]
    fn records_file_metadata_and_fingerprints() -> Result<()> {
        let temp = tempdir()?;
        let (commits, snapshots) = stores(temp.path());
        let source = temp.path().join("README.md");
        fs::write(&source, b"hello world!")?;
        let files = vec![
            TrackedFile {
                path: "README.md".to_string(),
                source,
                size: 12,
                media_type: Some("text/markdown".to_string()),
            },
            TrackedFile {
                path: "missing.txt".to_string(),
                source: temp.path().join("missing.txt"),
                size: 0,
                media_type: None,
            },
        ];
        let commit = commits.create("add readme", "alice", &files, None, &snapshots)?;
        assert!(is_short_id(&commit.id));
        assert!(snapshots.exists(&commit.snapshot));
        assert_eq!(
            commit.files[0].hash.as_deref(),
            Some(vc_domain::hash_bytes(b"hello world!").as_str())
        );
        assert_eq!(commit.files[1].hash, None);
        assert_eq!(commits.get(&commit.id)?, commit);
        Ok(())
    }

    #[test]
    fn same_message_and_author_get_distinct_ids() -> Result<()> {
        let temp = tempdir()?;
        let (commits, snapshots) = stores(temp.path());
        let first = commits.create("wip", "bob", &[], None, &snapshots)?;
        let second = commits.create("wip", "bob", &[], Some(first.id.clone()), &snapshots)?;
        assert_ne!(first.id, second.id);
        assert_ne!(first.snapshot, second.snapshot);
        assert_eq!(second.parent.as_deref(), Some(first.id.as_str()));
        Ok(())
    }

    #[test]
    fn unknown_ids_are_not_found() -> Result<()> {
        let temp = tempdir()?;
        let (commits, _) = stores(temp.path());
        for id in ["0123456789abcdef", "../../etc/passwd", ""] {
            let err = commits.get(id).unwrap_err();
            assert_eq!(VcError::kind_of(&err), Some(ErrorKind::NotFound));
        }
        Ok(())
    }

    #[test]
    fn mismatched_record_id_is_corruption() -> Result<()> {
        let records = Arc::new(MemoryRecordStore::new());
        let commits = CommitStore::new(records.clone());
        let raw = br#"{"id":"ffffffffffffffff","message":"m","author":"a","timestamp":"t","snapshot":"s","files":[]}"#;
        records.put(&commit_key("0123456789abcdef"), raw)?;
        let err = commits.get("0123456789abcdef").unwrap_err();
        assert_eq!(VcError::kind_of(&err), Some(ErrorKind::Corruption));
        Ok(())
    }

    #[test]
    fn colliding_commit_ids_take_a_fresh_timestamp() -> Result<()> {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static TICKS: AtomicUsize = AtomicUsize::new(0);
        fn stuck_then_moving() -> Result<String> {
            let tick = TICKS.fetch_add(1, Ordering::SeqCst);
            Ok(if tick == 0 {
                "2024-01-01T00:00:00Z".to_string()
            } else {
                "2024-01-01T00:00:01Z".to_string()
            })
        }

        let temp = tempdir()?;
        let records = Arc::new(MemoryRecordStore::new());
        let commits = CommitStore::new(records.clone()).with_clock(stuck_then_moving);
        let snapshots = SnapshotStore::new(temp.path().join("versions"));
        let taken = Commit::derive_id("2024-01-01T00:00:00Z", "wip", "bob");
        records.put(&commit_key(&taken), b"{}")?;

        let commit = commits.create("wip", "bob", &[], None, &snapshots)?;
        assert_ne!(commit.id, taken);
        assert_eq!(commit.timestamp, "2024-01-01T00:00:01Z");
        assert_eq!(
            commit.id,
            Commit::derive_id("2024-01-01T00:00:01Z", "wip", "bob")
        );
        Ok(())
    }

    #[test]
    fn persistent_commit_id_collisions_are_conflicts() -> Result<()> {
        fn frozen() -> Result<String> {
            Ok("2024-01-01T00:00:00Z".to_string())
        }

        let temp = tempdir()?;
        let records = Arc::new(MemoryRecordStore::new());
        let commits = CommitStore::new(records.clone()).with_clock(frozen);
        let snapshots = SnapshotStore::new(temp.path().join("versions"));
        let taken = Commit::derive_id("2024-01-01T00:00:00Z", "wip", "bob");
        records.put(&commit_key(&taken), b"{}")?;

        let err = commits.create("wip", "bob", &[], None, &snapshots).unwrap_err();
        assert_eq!(VcError::kind_of(&err), Some(ErrorKind::Conflict));
        // No snapshot is written for a commit that could not get an id.
        assert!(!temp.path().join("versions").exists());
        Ok(())
    }

    #[test]
    fn fingerprints_describe_the_snapshot_copy() -> Result<()> {
        let temp = tempdir()?;
        let (commits, snapshots) = stores(temp.path());
        let source = temp.path().join("notes.txt");
        fs::write(&source, b"original")?;
        let file = TrackedFile {
            path: "notes.txt".to_string(),
            source: source.clone(),
            size: 8,
            media_type: None,
        };
        let commit = commits.create("notes", "alice", &[file], None, &snapshots)?;
        fs::write(&source, b"rewritten later")?;

        let copy = fs::read(snapshots.path(&commit.snapshot).join("notes.txt"))?;
        assert_eq!(copy, b"original");
        assert_eq!(
            commit.files[0].hash.as_deref(),
            Some(vc_domain::hash_bytes(&copy).as_str())
        );
        Ok(())
    }
}
