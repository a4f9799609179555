//! Application configuration management.
//!
//! This module handles loading and saving the cache configuration: the API
//! base URL, an optional cache directory override, and the staleness TTL.
//!
//! Configuration is stored at `~/.config/platecache/config.json`. Environment
//! variables (loaded through `.env` when present) override file values:
//! `PLATECACHE_API_URL`, `PLATECACHE_CACHE_DIR`, `PLATECACHE_TTL_MINUTES`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;
use crate::cache::local::{DEFAULT_REFRESH_WAIT, DEFAULT_TTL};
use crate::cache::CacheOptions;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "platecache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub ttl_minutes: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if present (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("PLATECACHE_API_URL") {
            self.api_base_url = Some(url);
        }
        if let Ok(dir) = std::env::var("PLATECACHE_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Ok(minutes) = std::env::var("PLATECACHE_TTL_MINUTES") {
            if let Ok(minutes) = minutes.parse() {
                self.ttl_minutes = Some(minutes);
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Resolve into the runtime options used to open a `LocalCache`.
    pub fn cache_options(&self) -> Result<CacheOptions> {
        Ok(CacheOptions {
            base_url: self
                .api_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            cache_dir: self.cache_dir()?,
            ttl: self
                .ttl_minutes
                .map(|m| Duration::from_secs(m * 60))
                .unwrap_or(DEFAULT_TTL),
            refresh_wait: DEFAULT_REFRESH_WAIT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let config = Config::default();
        let options = config.cache_options().expect("options");
        assert_eq!(options.base_url, DEFAULT_BASE_URL);
        assert_eq!(options.ttl, DEFAULT_TTL);
    }

    #[test]
    fn test_explicit_values_win() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config {
            api_base_url: Some("http://example.test:8080".to_string()),
            cache_dir: Some(dir.path().to_path_buf()),
            ttl_minutes: Some(5),
        };
        let options = config.cache_options().expect("options");
        assert_eq!(options.base_url, "http://example.test:8080");
        assert_eq!(options.cache_dir, dir.path());
        assert_eq!(options.ttl, Duration::from_secs(300));
    }
}
