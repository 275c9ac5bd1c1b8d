use std::fmt;

use vc_domain::InvalidName;

use crate::core::tooling::diagnostics;

/// Things the engine can fail to find or find twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    Repository,
    Commit,
    Branch,
    Snapshot,
}

impl Entity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Repository => "repository",
            Self::Commit => "commit",
            Self::Branch => "branch",
            Self::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification callers branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Corruption,
    InvalidName,
}

/// Errors surfaced by the version-control engine.
///
/// Engine operations return `anyhow::Result`; these travel inside the
/// `anyhow::Error` and are recovered with [`VcError::kind_of`] or
/// `downcast_ref`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VcError {
    #[error("[VC404] {entity} '{id}' not found")]
    NotFound { entity: Entity, id: String },
    #[error("[VC409] {entity} '{id}' already exists")]
    Conflict { entity: Entity, id: String },
    #[error("[VC500] corrupt {what}: {detail}")]
    Corruption { what: String, detail: String },
    #[error("[VC400] {0}")]
    InvalidName(#[from] InvalidName),
}

impl VcError {
    pub(crate) fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn conflict(entity: Entity, id: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn corruption(what: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self::Corruption {
            what: what.into(),
            detail: detail.to_string(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Corruption { .. } => ErrorKind::Corruption,
            Self::InvalidName(_) => ErrorKind::InvalidName,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => diagnostics::NOT_FOUND,
            Self::Conflict { .. } => diagnostics::CONFLICT,
            Self::Corruption { .. } => diagnostics::CORRUPTION,
            Self::InvalidName(_) => diagnostics::INVALID_NAME,
        }
    }

    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::NotFound { entity, .. } => format!("{entity}_not_found"),
            Self::Conflict { entity, .. } => format!("{entity}_exists"),
            Self::Corruption { .. } => "corrupt_metadata".to_string(),
            Self::InvalidName(issue) => format!("invalid_{}", issue.kind.as_str()),
        }
    }

    /// Classify an engine error; `None` for I/O and other untyped failures.
    #[must_use]
    pub fn kind_of(err: &anyhow::Error) -> Option<ErrorKind> {
        err.downcast_ref::<Self>().map(Self::kind)
    }
}
