// cache.rs — IdentityCache: the persisted `kind:source_id -> remote id` mapping.
//
// The state file is a single JSON object with lexicographically sorted keys
// and 2-space indentation, so it diffs cleanly when checked in or inspected.
//
// Writes never touch the canonical file in place. The full mapping is written
// to `<file>.tmp`, synced, and renamed over the canonical path. A crash at any
// point leaves either the old file or the new one, never a truncated mix.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// Build the composite cache key for a source entity.
///
/// The format is `"{event_kind}:{source_id}"` and must stay stable across
/// releases: existing state files depend on it.
pub fn cache_key(event_kind: &str, source_id: &str) -> String {
    format!("{}:{}", event_kind, source_id)
}

/// In-memory identity mapping bound to its state file.
///
/// Every value was returned by a successful remote create; callers must
/// never insert synthetic ids into a cache they intend to persist.
#[derive(Debug, Clone)]
pub struct IdentityCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl IdentityCache {
    /// An empty cache that will persist to `path`.
    pub fn empty(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the mapping stored at `path`.
    ///
    /// A missing file is a cold start. An unreadable or unparsable file is
    /// logged as a warning and also treated as a cold start.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let entries = read_entries(path).unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// Remote record id stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Remember `remote_id` under `key`. Returns the previous id, if any.
    pub fn insert(&mut self, key: impl Into<String>, remote_id: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), remote_id.into())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The full mapping.
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Path of the canonical state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the full mapping to disk atomically.
    pub fn persist(&self) -> Result<(), CacheError> {
        let mut json = serde_json::to_string_pretty(&self.entries)?;
        json.push('\n');

        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|source| io_err(parent, source))?;

        let tmp_path = tmp_path(&self.path);
        {
            let mut file = File::create(&tmp_path).map_err(|source| io_err(&tmp_path, source))?;
            file.write_all(json.as_bytes())
                .map_err(|source| io_err(&tmp_path, source))?;
            file.sync_all().map_err(|source| io_err(&tmp_path, source))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|source| io_err(&self.path, source))?;
        fsync_dir(parent)?;

        tracing::debug!(
            path = %self.path.display(),
            entries = self.entries.len(),
            "identity cache persisted"
        );
        Ok(())
    }
}

fn read_entries(path: &Path) -> Option<BTreeMap<String, String>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no identity cache found, starting empty");
            return None;
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "identity cache is unreadable, starting empty"
            );
            return None;
        }
    };

    match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
        Ok(entries) => {
            tracing::debug!(path = %path.display(), entries = entries.len(), "identity cache loaded");
            Some(entries)
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "identity cache is corrupt, starting empty"
            );
            None
        }
    }
}

/// Sibling temp file used for the write-then-rename.
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("identity-cache"));
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(unix)]
fn fsync_dir(path: &Path) -> Result<(), CacheError> {
    let dir = File::open(path).map_err(|source| io_err(path, source))?;
    dir.sync_all().map_err(|source| io_err(path, source))?;
    Ok(())
}

#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> Result<(), CacheError> {
    Ok(())
}

fn io_err(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::IoError {
        path: path.to_path_buf(),
        source,
    }
}
