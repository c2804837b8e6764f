//! Engine configuration
//!
//! Loaded from `pbxgraph.toml` next to the project document, falling back to
//! the user config directory and then to built-in defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::Platform;

/// File name looked up next to a project document
pub const CONFIG_FILE_NAME: &str = "pbxgraph.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Prefix for generated bundle identifiers (`<prefix>.<TargetName>`)
    #[serde(default = "default_bundle_id_prefix")]
    pub bundle_id_prefix: String,

    /// SWIFT_VERSION seeded into new targets
    #[serde(default = "default_swift_version")]
    pub swift_version: String,

    /// Minimum OS versions seeded into new targets, keyed by platform
    #[serde(default = "default_deployment_targets")]
    pub deployment_targets: BTreeMap<Platform, String>,

    /// Synchronized folder enumeration
    #[serde(default)]
    pub sync: SyncConfig,
}

fn default_bundle_id_prefix() -> String {
    "com.example".to_string()
}

fn default_swift_version() -> String {
    "5.0".to_string()
}

fn default_deployment_targets() -> BTreeMap<Platform, String> {
    Platform::all()
        .into_iter()
        .map(|p| (p, p.default_deployment_target().to_string()))
        .collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bundle_id_prefix: default_bundle_id_prefix(),
            swift_version: default_swift_version(),
            deployment_targets: default_deployment_targets(),
            sync: SyncConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SyncConfig {
    /// Skip dot-files and dot-directories when enumerating a folder
    #[serde(default = "default_true")]
    pub ignore_hidden: bool,

    /// Maximum directory depth to enumerate (unbounded when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ignore_hidden: true,
            max_depth: None,
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Deployment target for a platform, falling back to the platform default
    pub fn deployment_target(&self, platform: Platform) -> &str {
        self.deployment_targets
            .get(&platform)
            .map(String::as_str)
            .unwrap_or_else(|| platform.default_deployment_target())
    }

    /// Resolve the configuration for a project document:
    /// `<document dir>/pbxgraph.toml`, then `<config dir>/pbxgraph/config.toml`,
    /// then defaults.
    pub fn discover(document: &Path) -> Result<Self> {
        match find_config_file(document) {
            Some(path) => {
                tracing::debug!("Loading engine config from {}", path.display());
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

fn find_config_file(document: &Path) -> Option<PathBuf> {
    let local = document
        .parent()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .filter(|p| p.exists());
    if local.is_some() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("pbxgraph").join("config.toml"))
        .filter(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.bundle_id_prefix, "com.example");
        assert_eq!(config.deployment_target(Platform::Ios), "17.0");
        assert!(config.sync.ignore_hidden);
        assert!(config.sync.max_depth.is_none());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
bundle_id_prefix = "org.acme"

[deployment_targets]
macOS = "13.0"

[sync]
max_depth = 4
"#,
        )
        .unwrap();
        assert_eq!(config.bundle_id_prefix, "org.acme");
        assert_eq!(config.swift_version, "5.0");
        assert_eq!(config.deployment_target(Platform::Macos), "13.0");
        // Missing platforms fall back to their default
        assert_eq!(config.deployment_target(Platform::Ios), "17.0");
        assert_eq!(config.sync.max_depth, Some(4));
        assert!(config.sync.ignore_hidden);
    }

    #[test]
    fn test_discover_next_to_document() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "swift_version = \"6.0\"\n",
        )
        .unwrap();
        let config = EngineConfig::discover(&temp_dir.path().join("App.pbxgraph")).unwrap();
        assert_eq!(config.swift_version, "6.0");
    }
}
