use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub max_upload_mb: Option<usize>,

    pub store: Option<StoreFileConfig>,
}

/// `[store]` section.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct StoreFileConfig {
    /// "pocketbase" or "memory"
    pub kind: Option<String>,
    pub url: Option<String>,
    pub collection: Option<String>,
    pub timeout_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
