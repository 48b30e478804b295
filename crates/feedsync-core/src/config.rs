use crate::error::FeedError;
use crate::result::FeedResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What to do when a locator names an item that is no longer in the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingItemPolicy {
    /// Snap to the head of the feed.
    #[default]
    Head,
    /// Stay at the last observed index, clamped to the new length.
    KeepPosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Neighbours preloaded on each side of the current item.
    pub prefetch_radius: usize,
    /// Distance from the tail at which more items are requested.
    pub load_more_threshold: usize,
    pub missing_item_policy: MissingItemPolicy,
    /// How long a pagination failure notice stays visible.
    pub notice_ttl_secs: u64,
    /// Artificial delay applied by the in-memory source.
    pub simulated_latency_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            prefetch_radius: 2,
            load_more_threshold: 3,
            missing_item_policy: MissingItemPolicy::Head,
            notice_ttl_secs: 4,
            simulated_latency_ms: 0,
        }
    }
}

impl FeedConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/feedsync/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("feedsync/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("feedsync\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    /// Load from the default location, falling back to defaults.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_or_default(&path),
            _ => Self::default(),
        }
    }

    /// Load from `path`; a missing or malformed file yields defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(FeedError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!("Ignoring config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> FeedResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> FeedResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| FeedError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FeedResult<()> {
        if self.load_more_threshold == 0 {
            return Err(FeedError::Config(
                "load_more_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_ttl_secs)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}
