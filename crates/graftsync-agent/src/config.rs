//! Agent configuration file model.
//!
//! Loaded from TOML or JSON depending on the file extension. Storage
//! declarations are only parsed here; [`crate::storage_config`] validates them
//! and turns them into a hierarchy.

use std::path::Path;

use graftsync_hier::{FileSystemCasing, FilterRule};
use serde::{Deserialize, Serialize};

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Named storage roots to replicate.
    pub storage: Vec<StorageRootConfig>,
    /// Routing pipeline settings.
    pub routing: RoutingConfig,
    /// Filesystem watcher settings.
    pub watcher: WatcherConfig,
}

/// A named root and everything grafted beneath it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRootConfig {
    /// Logical name, unique ignoring case.
    pub name: String,
    /// Absolute directory path.
    pub path: String,
    /// Casing rules; detected from the filesystem when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub casing: Option<FileSystemCasing>,
    /// Filters applied to paths under this root, last match wins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterConfig>,
    /// Locations grafted into this root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<LocationConfig>,
}

/// A directory grafted into its parent at a relative path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Graft point, relative to the parent.
    pub path: String,
    /// Absolute directory mounted at the graft point.
    pub graft: String,
    /// Filters applied to paths under the grafted directory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterConfig>,
    /// Further grafts beneath this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<LocationConfig>,
}

/// One filter rule. At most one of `glob`, `extension` and `regex` may be
/// set; with none the rule applies to every path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Include or exclude.
    #[serde(default)]
    pub rule: FilterRule,
    /// Glob over the relative path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glob: Option<String>,
    /// File extension, with or without the leading dot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Raw regex over the relative path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

/// Routing pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Install the logging route.
    pub log_route: bool,
    /// Maximum number of files hashed at once.
    pub snapshot_parallelism: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            log_route: true,
            snapshot_parallelism: 4,
        }
    }
}

/// Filesystem watcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Watch local roots for changes.
    pub enabled: bool,
    /// Walk a root again when its watcher reports lost events.
    pub rescan_on_overflow: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rescan_on_overflow: true,
        }
    }
}

impl AgentConfig {
    /// Load from a `.toml` or `.json` file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_lowercase().as_str() {
            "toml" => {
                let config: AgentConfig = toml::from_str(&contents)?;
                Ok(config)
            }
            "json" => {
                let config: AgentConfig = serde_json::from_str(&contents)?;
                Ok(config)
            }
            _ => anyhow::bail!("Unsupported config file extension: {}", ext),
        }
    }
}
