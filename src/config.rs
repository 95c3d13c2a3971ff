use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

const APP_DIR: &str = "novelty";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_feeds_path")]
    pub feeds_path: String,

    /// Unbookmarked articles saved longer ago than this are purged by `cleanup`.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u32,

    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("novelty.db").to_string_lossy().to_string()
}

fn default_feeds_path() -> String {
    config_dir().join("feeds.toml").to_string_lossy().to_string()
}

fn default_retention_hours() -> u32 {
    24
}

fn default_max_concurrent_fetches() -> usize {
    5
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            feeds_path: default_feeds_path(),
            retention_hours: default_retention_hours(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`, writing a default file there when none exists.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Retention window in milliseconds.
    pub fn retention_ms(&self) -> i64 {
        i64::from(self.retention_hours) * 60 * 60 * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(r#"db_path = "/tmp/x.db""#).unwrap();
        assert_eq!(config.db_path, "/tmp/x.db");
        assert_eq!(config.retention_hours, 24);
        assert_eq!(config.max_concurrent_fetches, 5);
        assert!(config.feeds_path.ends_with("feeds.toml"));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.retention_hours, 24);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.db_path, config.db_path);
    }

    #[test]
    fn test_retention_ms() {
        let config = Config {
            retention_hours: 24,
            ..Config::default()
        };
        assert_eq!(config.retention_ms(), 86_400_000);
    }
}
