#![deny(clippy::all)]

mod core;

pub mod api;

pub use crate::core::config::{CommitConfig, Config, EnvSnapshot, HistoryConfig, RegistryConfig};
pub use crate::core::errors::{Entity, ErrorKind, VcError};
pub use crate::core::repo::{Registry, RepoSummary, Repository, DEFAULT_HISTORY_LIMIT};
pub use crate::core::store::{
    BranchStore, CommitStore, FsRecordStore, MemoryRecordStore, RecordStore, RepoLock,
    SnapshotStore,
};
pub use crate::core::tooling::diagnostics;
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome};

pub use vc_domain::{
    BranchRecord, BranchSummary, Commit, FileEntry, RepoStats, TrackedFile, DEFAULT_BRANCH,
};
