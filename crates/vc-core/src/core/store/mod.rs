//! Storage for repository state: records, snapshots, commits, and branches.

mod branches;
mod commits;
mod lock;
mod records;
mod snapshot;

pub use branches::BranchStore;
pub use commits::CommitStore;
pub use lock::RepoLock;
pub use records::{FsRecordStore, MemoryRecordStore, RecordStore};
pub use snapshot::SnapshotStore;

pub(crate) use records::{read_json, write_json};

/// Fresh ids to try before giving up on an id collision.
pub(crate) const MAX_ID_ATTEMPTS: usize = 8;
