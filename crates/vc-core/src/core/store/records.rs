//! Key/value record storage behind the commit and branch stores.
//!
//! Keys are `/`-separated relative paths such as `HEAD`,
//! `branches/main.json` or `versions/<id>.json`.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use anyhow::{anyhow, Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::core::errors::VcError;

const TMP_DIR: &str = "tmp";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub trait RecordStore: Send + Sync {
    /// Read a record, `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace a record in a single step; readers see the old or the new
    /// bytes, never a mix.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    fn exists(&self, key: &str) -> Result<bool>;

    /// Keys stored directly under `prefix` (which should end in `/`), sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Decode a JSON record; undecodable bytes are reported as corruption.
pub(crate) fn read_json<T: DeserializeOwned>(
    store: &dyn RecordStore,
    key: &str,
) -> Result<Option<T>> {
    let Some(bytes) = store.get(key)? else {
        return Ok(None);
    };
    let value = serde_json::from_slice(&bytes)
        .map_err(|err| VcError::corruption(format!("record '{key}'"), err))?;
    Ok(Some(value))
}

pub(crate) fn write_json<T: Serialize>(store: &dyn RecordStore, key: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to encode record '{key}'"))?;
    store.put(key, &bytes)
}

/// Records stored as files under a repository's metadata directory.
#[derive(Debug)]
pub struct FsRecordStore {
    root: PathBuf,
}

impl FsRecordStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || key.starts_with('/')
            || key.split('/').any(|part| part.is_empty() || part == "." || part == "..")
        {
            return Err(anyhow!("invalid record key '{key}'"));
        }
        Ok(key.split('/').fold(self.root.clone(), |path, part| path.join(part)))
    }

    fn tmp_path(&self, key: &str) -> PathBuf {
        let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let flat = key.replace('/', "_");
        self.root
            .join(TMP_DIR)
            .join(format!("{flat}.{}.{seq}.partial", std::process::id()))
    }
}

fn fsync_dir(dir: &Path) -> Result<()> {
    let file = File::open(dir)?;
    file.sync_all()?;
    Ok(())
}

impl RecordStore for FsRecordStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read record {}", path.display()))
            }
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let dest = self.path_for(key)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let tmp = self.tmp_path(key);
        if let Some(parent) = tmp.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create temp directory {}", parent.display()))?;
        }

        {
            let mut file = File::create(&tmp)
                .with_context(|| format!("failed to create temp record {}", tmp.display()))?;
            file.write_all(bytes)
                .with_context(|| format!("failed to write temp record {}", tmp.display()))?;
            file.sync_all()
                .with_context(|| format!("failed to flush temp record {}", tmp.display()))?;
        }

        if let Err(err) = fs::rename(&tmp, &dest) {
            let _ = fs::remove_file(&tmp);
            return Err(err).with_context(|| {
                format!(
                    "failed to move record into place ({} -> {})",
                    tmp.display(),
                    dest.display()
                )
            });
        }
        if let Some(parent) = dest.parent() {
            fsync_dir(parent).ok();
        }
        debug!(%key, bytes = bytes.len(), "record written");
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key)?.is_file())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = match prefix.trim_end_matches('/') {
            "" => self.root.clone(),
            trimmed => self.path_for(trimmed)?,
        };
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to list {}", dir.display()))
            }
        };
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                keys.push(format!("{prefix}{name}"));
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-process record store, handy for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.records
            .lock()
            .map_err(|_| anyhow!("memory record store lock poisoned"))
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.lock()?.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.contains_key(key))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()?
            .keys()
            .filter(|key| {
                key.strip_prefix(prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn exercise(store: &dyn RecordStore) -> Result<()> {
        assert_eq!(store.get("branches/main.json")?, None);
        store.put("branches/main.json", b"{}")?;
        store.put("branches/feature.json", b"{}")?;
        store.put("versions/abc.json", b"{}")?;
        store.put("HEAD", b"main")?;
        assert!(store.exists("HEAD")?);
        assert_eq!(store.get("HEAD")?, Some(b"main".to_vec()));
        assert_eq!(
            store.list("branches/")?,
            vec!["branches/feature.json", "branches/main.json"]
        );
        store.put("HEAD", b"feature")?;
        assert_eq!(store.get("HEAD")?, Some(b"feature".to_vec()));
        Ok(())
    }

    #[test]
    fn fs_store_round_trips_records() -> Result<()> {
        let temp = tempdir()?;
        let store = FsRecordStore::new(temp.path().join(".vc"));
        exercise(&store)?;
        assert!(temp.path().join(".vc/branches/main.json").is_file());
        let leftovers: Vec<_> = fs::read_dir(temp.path().join(".vc").join(TMP_DIR))?.collect();
        assert!(leftovers.is_empty(), "temp files should be renamed away");
        Ok(())
    }

    #[test]
    fn memory_store_round_trips_records() -> Result<()> {
        exercise(&MemoryRecordStore::new())
    }

    #[test]
    fn fs_store_rejects_escaping_keys() {
        let store = FsRecordStore::new("/nonexistent/.vc");
        assert!(store.get("../outside").is_err());
        assert!(store.get("branches//x").is_err());
    }

    #[test]
    fn fs_list_skips_directories() -> Result<()> {
        let temp = tempdir()?;
        let store = FsRecordStore::new(temp.path());
        store.put("versions/abc.json", b"{}")?;
        fs::create_dir_all(temp.path().join("versions").join("snapshot-abc"))?;
        assert_eq!(store.list("versions/")?, vec!["versions/abc.json"]);
        Ok(())
    }

    #[test]
    fn undecodable_records_are_corruption() -> Result<()> {
        let store = MemoryRecordStore::new();
        store.put("branches/main.json", b"{not json")?;
        let err = read_json::<serde_json::Value>(&store, "branches/main.json").unwrap_err();
        assert_eq!(
            VcError::kind_of(&err),
            Some(crate::core::errors::ErrorKind::Corruption)
        );
        write_json(&store, "x.json", &json!({"a": 1}))?;
        assert_eq!(
            read_json::<serde_json::Value>(&store, "x.json")?,
            Some(json!({"a": 1}))
        );
        Ok(())
    }
}
