//! Validation for names and paths that end up on disk.

use std::fmt;
use std::path::{Component, Path};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameKind {
    Branch,
    Repository,
    TrackedPath,
}

impl NameKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Branch => "branch",
            Self::Repository => "repository",
            Self::TrackedPath => "path",
        }
    }
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("invalid {kind} name '{value}': {reason}")]
pub struct InvalidName {
    pub kind: NameKind,
    pub value: String,
    pub reason: &'static str,
}

impl InvalidName {
    fn new(kind: NameKind, value: &str, reason: &'static str) -> Self {
        Self {
            kind,
            value: value.to_string(),
            reason,
        }
    }
}

/// Branch names become `branches/<name>.json`, so they must be a single
/// path segment.
pub fn validate_branch_name(name: &str) -> Result<(), InvalidName> {
    validate_segment(NameKind::Branch, name)
}

/// Repository names become a directory under the registry root.
pub fn validate_repo_name(name: &str) -> Result<(), InvalidName> {
    validate_segment(NameKind::Repository, name)
}

fn validate_segment(kind: NameKind, name: &str) -> Result<(), InvalidName> {
    if name.is_empty() {
        return Err(InvalidName::new(kind, name, "must not be empty"));
    }
    if name.len() > 128 {
        return Err(InvalidName::new(kind, name, "must be at most 128 characters"));
    }
    if name.starts_with('.') || name.starts_with('-') {
        return Err(InvalidName::new(kind, name, "must not start with '.' or '-'"));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return Err(InvalidName::new(
            kind,
            name,
            "may only contain ASCII letters, digits, '-', '_' and '.'",
        ));
    }
    Ok(())
}

/// Normalize a tracked file path to a relative, `/`-separated form that
/// cannot escape the repository root.
pub fn normalize_tracked_path(raw: &str) -> Result<String, InvalidName> {
    let kind = NameKind::TrackedPath;
    let mut parts = Vec::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| InvalidName::new(kind, raw, "must be valid UTF-8"))?;
                parts.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(InvalidName::new(kind, raw, "must not contain '..'"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(InvalidName::new(kind, raw, "must be relative"));
            }
        }
    }
    if parts.is_empty() {
        return Err(InvalidName::new(kind, raw, "must name a file"));
    }
    if parts[0] == ".vc" {
        return Err(InvalidName::new(kind, raw, "must not point into the metadata area"));
    }
    Ok(parts.join("/"))
}
