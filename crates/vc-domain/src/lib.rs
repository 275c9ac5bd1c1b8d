#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod branch;
pub mod commit;
pub mod hash;
pub mod names;
pub mod stats;

pub use branch::{BranchRecord, BranchSummary, DEFAULT_BRANCH};
pub use commit::{Commit, FileEntry, TrackedFile};
pub use hash::{hash_bytes, hash_file, is_short_id, ID_HEX_LEN};
pub use names::{
    normalize_tracked_path, validate_branch_name, validate_repo_name, InvalidName, NameKind,
};
pub use stats::RepoStats;
