use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::core::repo::DEFAULT_HISTORY_LIMIT;

const DEFAULT_REPOS_DIR: &str = "./repositories";
const DEFAULT_AUTHOR: &str = "Anonymous";

#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    #[must_use]
    pub fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    #[must_use]
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    registry: RegistryConfig,
    commit: CommitConfig,
    history: HistoryConfig,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    #[must_use]
    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        let non_empty = |key: &str| snapshot.var(key).map(str::trim).filter(|v| !v.is_empty());
        Self {
            registry: RegistryConfig {
                root: PathBuf::from(non_empty("VC_REPOS_DIR").unwrap_or(DEFAULT_REPOS_DIR)),
            },
            commit: CommitConfig {
                default_author: non_empty("VC_DEFAULT_AUTHOR")
                    .unwrap_or(DEFAULT_AUTHOR)
                    .to_string(),
            },
            history: HistoryConfig {
                default_limit: non_empty("VC_HISTORY_LIMIT")
                    .and_then(|raw| raw.parse::<usize>().ok())
                    .filter(|limit| *limit > 0)
                    .unwrap_or(DEFAULT_HISTORY_LIMIT),
            },
        }
    }

    /// Replace the registry root, e.g. from a `--repos-dir` flag.
    #[must_use]
    pub fn with_repos_dir(mut self, root: impl Into<PathBuf>) -> Self {
        self.registry.root = root.into();
        self
    }

    #[must_use]
    pub fn registry(&self) -> &RegistryConfig {
        &self.registry
    }

    #[must_use]
    pub fn commit(&self) -> &CommitConfig {
        &self.commit
    }

    #[must_use]
    pub fn history(&self) -> &HistoryConfig {
        &self.history
    }
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CommitConfig {
    pub default_author: String,
}

#[derive(Debug, Clone, Copy)]
pub struct HistoryConfig {
    pub default_limit: usize,
}
