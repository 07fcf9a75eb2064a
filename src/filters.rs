use crate::config::AdblockConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const CACHE_NAME_MAX_LEN: usize = 96;

/// Filter list sources
pub struct FilterSources;

impl FilterSources {
    pub const EASYLIST: &'static str = "https://easylist.to/easylist/easylist.txt";
    pub const EASYPRIVACY: &'static str = "https://easylist.to/easylist/easyprivacy.txt";
    pub const SOCIAL_ANNOYANCES: &'static str = "https://easylist.to/easylist/fanboy-social.txt";
}

/// Where a filter list comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterSource {
    Local { path: PathBuf },
    Remote { url: String },
}

impl FilterSource {
    pub fn local(path: impl AsRef<Path>) -> Self {
        FilterSource::Local {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        FilterSource::Remote { url: url.into() }
    }

    /// Identifier of the resource, used as cache key for remote lists
    pub fn id(&self) -> String {
        match self {
            FilterSource::Local { path } => path.display().to_string(),
            FilterSource::Remote { url } => url.clone(),
        }
    }
}

impl fmt::Display for FilterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// Filter list manager.
///
/// Produces the raw lines of a filter list. Remote lists are cached on disk
/// and reused until the cache expires.
pub struct FilterManager {
    cache_dir: PathBuf,
    expiry: Duration,
    use_cache: bool,
    client: reqwest::Client,
}

impl FilterManager {
    pub fn new(cache_dir: impl Into<PathBuf>, expiry: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            cache_dir: cache_dir.into(),
            expiry,
            use_cache: true,
            client,
        }
    }

    pub fn from_config(config: &AdblockConfig) -> Self {
        let mut manager = Self::new(config.cache_dir.clone(), config.cache_expiry());
        manager.use_cache = config.use_cache;
        manager
    }

    /// Disable the on-disk cache for remote lists
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// Load the lines of a filter list
    pub async fn load_lines(&self, source: &FilterSource) -> Result<Vec<String>> {
        let content = match source {
            FilterSource::Local { path } => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read filter list {}", path.display()))?,
            FilterSource::Remote { url } => self.load_remote(url).await?,
        };

        Ok(split_lines(&content))
    }

    async fn load_remote(&self, url: &str) -> Result<String> {
        if !self.use_cache {
            return self.fetch(url).await;
        }

        let cache_path = self.cache_path(url);
        if self.is_fresh(&cache_path).await {
            if let Ok(content) = tokio::fs::read_to_string(&cache_path).await {
                debug!(url, path = %cache_path.display(), "Using cached filter list");
                return Ok(content);
            }
        }

        match self.fetch(url).await {
            Ok(content) => {
                if let Err(e) = self.write_cache(&cache_path, &content).await {
                    warn!(url, error = %e, "Could not cache filter list");
                }
                Ok(content)
            }
            Err(e) => match tokio::fs::read_to_string(&cache_path).await {
                Ok(stale) => {
                    warn!(url, error = %e, "Fetch failed, using stale cached filter list");
                    Ok(stale)
                }
                Err(_) => Err(e),
            },
        }
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(url, "Fetching filter list");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch filter list {url}"))?
            .error_for_status()?;

        Ok(response.text().await?)
    }

    async fn write_cache(&self, path: &Path, content: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    async fn is_fresh(&self, path: &Path) -> bool {
        let Ok(metadata) = tokio::fs::metadata(path).await else {
            return false;
        };
        let Ok(modified) = metadata.modified() else {
            return false;
        };

        // A modification time in the future counts as fresh
        SystemTime::now()
            .duration_since(modified)
            .map_or(true, |age| age < self.expiry)
    }

    /// Cache file for a resource identifier
    pub fn cache_path(&self, id: &str) -> PathBuf {
        self.cache_dir.join(cache_file_name(id))
    }

    /// Clear filter cache
    pub async fn clear_cache(&self) -> Result<()> {
        let mut entries = match tokio::fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == "txt") {
                tokio::fs::remove_file(entry.path()).await?;
            }
        }
        Ok(())
    }
}

fn split_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Readable, filesystem-safe name with a hash suffix to keep distinct
/// identifiers apart after sanitizing.
fn cache_file_name(id: &str) -> String {
    let readable: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .take(CACHE_NAME_MAX_LEN)
        .collect();

    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);

    format!("{}-{:016x}.txt", readable, hasher.finish())
}
