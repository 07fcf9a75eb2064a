use crate::filters::{FilterSource, FilterSources};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CACHE_EXPIRY_SECS: u64 = 24 * 60 * 60;

/// Configuration for the ad blocker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdblockConfig {
    pub sources: Vec<FilterSource>,
    /// Raw rule lines added after all sources
    pub custom_filters: Vec<String>,
    pub cache_dir: PathBuf,
    pub cache_expiry_secs: u64,
    pub use_cache: bool,
}

impl Default for AdblockConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                FilterSource::remote(FilterSources::EASYLIST),
                FilterSource::remote(FilterSources::EASYPRIVACY),
            ],
            custom_filters: vec![],
            cache_dir: std::env::temp_dir().join("adblock-parser"),
            cache_expiry_secs: DEFAULT_CACHE_EXPIRY_SECS,
            use_cache: true,
        }
    }
}

impl AdblockConfig {
    /// Create a minimal configuration for basic ad blocking
    pub fn minimal() -> Self {
        Self {
            sources: vec![FilterSource::remote(FilterSources::EASYLIST)],
            ..Self::default()
        }
    }

    /// Create a privacy-focused configuration
    pub fn privacy_focused() -> Self {
        Self {
            sources: vec![
                FilterSource::remote(FilterSources::EASYLIST),
                FilterSource::remote(FilterSources::EASYPRIVACY),
                FilterSource::remote(FilterSources::SOCIAL_ANNOYANCES),
            ],
            ..Self::default()
        }
    }

    /// Create a configuration without any remote list
    pub fn offline() -> Self {
        Self {
            sources: vec![],
            ..Self::default()
        }
    }

    pub fn cache_expiry(&self) -> Duration {
        Duration::from_secs(self.cache_expiry_secs)
    }

    /// Load a JSON configuration file. Missing fields take their default value.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
