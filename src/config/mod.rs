//! System configuration management for Ermine

pub mod schema;

pub use schema::Config;

use crate::error::{ErmineError, ErmineResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ermine")
            .join("config.toml")
    }

    /// Load configuration, falling back to defaults if not exists
    pub async fn load(&self) -> ErmineResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> ErmineResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ErmineError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| ErmineError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> ErmineResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            ErmineError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> ErmineResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ErmineError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Ensure cache directories exist
    pub async fn ensure_cache_dirs(config: &Config) -> ErmineResult<()> {
        let dirs = [config.cache.root_dir(), config.cache.temp()];

        for dir in &dirs {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| ErmineError::io(format!("creating directory {}", dir.display()), e))?;
        }

        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.registry.name, "official");
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.registry.url = Some("https://pkg.example.com".to_string());

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(
            loaded.registry.url.as_deref(),
            Some("https://pkg.example.com")
        );
    }

    #[tokio::test]
    async fn ensure_cache_dirs_creates() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.cache.root = Some(temp.path().join("cache"));

        ConfigManager::ensure_cache_dirs(&config).await.unwrap();
        assert!(temp.path().join("cache").exists());
        assert!(temp.path().join("cache").join("tmp").exists());
    }
}
