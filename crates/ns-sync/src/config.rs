// config.rs — SyncConfig: where the cache lives, where events go, how to
// reach the remote store.
//
// Resolution is layered, lowest precedence first:
//   1. built-in defaults
//   2. `notion-sync.toml` (or an explicit `--config` file)
//   3. environment variables
// CLI flags are applied on top by the binary.
//
// Environment access goes through a lookup closure so tests never touch the
// process environment.

use std::fs;
use std::path::{Path, PathBuf};

use ns_events::EventKind;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::routing::RoutingTable;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "notion-sync.toml";

/// Notion integration token.
pub const TOKEN_VAR: &str = "NOTION_API_TOKEN";

/// Identity cache path override.
pub const CACHE_VAR: &str = "NOTION_SYNC_CACHE";

/// Notion API version override.
pub const API_VERSION_VAR: &str = "NOTION_API_VERSION";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Path of the identity cache state file.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Destination databases from the config file.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Remote store connection settings.
    #[serde(default)]
    pub notion: NotionConfig,

    /// Integration token. Only ever read from the environment.
    #[serde(skip)]
    pub api_token: Option<String>,

    /// Destination databases from the environment; override the file.
    #[serde(skip)]
    pub env_routing: RoutingTable,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            routing: RoutingConfig::default(),
            notion: NotionConfig::default(),
            api_token: None,
            env_routing: RoutingTable::default(),
        }
    }
}

/// `[routing]` section: one optional database id per kind plus a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub default: Option<String>,
    pub issues: Option<String>,
    pub pull_request: Option<String>,
    pub discussion: Option<String>,
    pub project: Option<String>,
    pub workflow_run: Option<String>,
}

impl RoutingConfig {
    fn route(&self, kind: EventKind) -> Option<&String> {
        match kind {
            EventKind::Issues => self.issues.as_ref(),
            EventKind::PullRequest => self.pull_request.as_ref(),
            EventKind::Discussion => self.discussion.as_ref(),
            EventKind::Project => self.project.as_ref(),
            EventKind::WorkflowRun => self.workflow_run.as_ref(),
        }
    }

    pub fn to_table(&self) -> RoutingTable {
        let mut table = RoutingTable::new();
        for kind in EventKind::ALL {
            if let Some(id) = self.route(kind).filter(|id| !id.trim().is_empty()) {
                table.set_route(kind.as_str(), id.trim());
            }
        }
        if let Some(id) = self.default.as_ref().filter(|id| !id.trim().is_empty()) {
            table.set_default(id.trim());
        }
        table
    }
}

/// `[notion]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotionConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// Serde default functions
fn default_cache_path() -> PathBuf {
    PathBuf::from(".notion-sync").join("cache.json")
}

fn default_api_version() -> String {
    "2022-06-28".to_string()
}

fn default_base_url() -> String {
    "https://api.notion.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl SyncConfig {
    /// Parse TOML config text. `path` is only used in error messages.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a config file that must exist.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Resolve the full configuration.
    ///
    /// An explicit file must exist. Without one, `notion-sync.toml` in
    /// `search_dir` is used if present, else defaults. The environment is
    /// applied last.
    pub fn resolve(
        explicit: Option<&Path>,
        search_dir: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_file(path)?,
            None => {
                let candidate = search_dir.join(DEFAULT_CONFIG_FILE);
                if candidate.is_file() {
                    tracing::debug!(path = %candidate.display(), "loading config file");
                    Self::load_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(lookup);
        Ok(config)
    }

    /// Overlay environment values. Blank values count as unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(token) = get(TOKEN_VAR) {
            self.api_token = Some(token);
        }
        if let Some(path) = get(CACHE_VAR) {
            self.cache_path = PathBuf::from(path);
        }
        if let Some(version) = get(API_VERSION_VAR) {
            self.notion.api_version = version;
        }
        self.env_routing = RoutingTable::from_lookup(&lookup);
    }

    /// The effective routing table: file routes overlaid by the environment.
    pub fn routing_table(&self) -> RoutingTable {
        let mut table = self.routing.to_table();
        table.merge(self.env_routing.clone());
        table
    }

    /// The integration token, or a fatal error if it is missing.
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.api_token
            .as_deref()
            .ok_or(ConfigError::MissingToken { var: TOKEN_VAR })
    }
}
