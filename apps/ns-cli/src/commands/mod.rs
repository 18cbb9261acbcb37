pub mod cache;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::Context;
use ns_sync::SyncConfig;

/// Environment lookup backed by the real process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Resolve config from the working directory, an optional explicit file,
/// and `lookup`.
pub fn load_config(
    explicit: Option<&Path>,
    search_dir: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<SyncConfig> {
    SyncConfig::resolve(explicit, search_dir, lookup).context("failed to load configuration")
}

/// The directory `notion-sync.toml` is searched in.
pub fn working_dir() -> anyhow::Result<PathBuf> {
    std::env::current_dir().context("cannot determine the working directory")
}
