//! The repository facade and the registry of repositories.

mod registry;
mod repository;
mod stats;

pub use registry::{Registry, RepoSummary};
pub use repository::Repository;

/// Commits returned by `history` when the caller names no limit.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
