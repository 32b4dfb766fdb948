//! Mirror configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a [`Mirror`](crate::Mirror) handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Display name of the upstream cluster to mirror.
    pub cluster: String,
    /// Database file for the mirrored state. `None` keeps the mirror in
    /// memory; a path persists it, though callers are expected to refresh
    /// again on startup anyway.
    pub data_path: Option<PathBuf>,
}

impl MirrorConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MirrorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// In-memory configuration for the given cluster.
    pub fn in_memory(cluster: &str) -> Self {
        Self {
            cluster: cluster.to_string(),
            data_path: None,
        }
    }
}
