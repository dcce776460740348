//! Sync configuration.
//!
//! Loaded from `sync_config.yaml` in the data directory. Both fields are
//! optional; sync stays unconfigured until the user fills them in.
//!
//! ```yaml
//! base_url: "https://wallet-sync.example.com/v1"
//! user_id: "u-7f3a"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "sync_config.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the remote document store.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Logged-in user id; keys the per-user remote document.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl SyncConfig {
    /// True when both the endpoint and the user are known.
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.user_id.is_some()
    }

    fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE)
    }

    /// Load the config from the data directory, falling back to defaults
    /// when the file does not exist yet.
    pub fn load_or_default(data_dir: &Path) -> Result<Self> {
        let path = Self::path(data_dir);
        if !path.exists() {
            debug!("No sync config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: SyncConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        debug!("Loaded sync config from {}", path.display());
        Ok(config)
    }

    /// Write the config back to the data directory.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let path = Self::path(data_dir);
        let yaml = serde_yaml::to_string(self)?;
        fs::write(&path, yaml).with_context(|| format!("failed to write {}", path.display()))?;
        info!("Saved sync config to {}", path.display());
        Ok(())
    }
}
