//! System configuration schema for Ermine
//!
//! Configuration is stored at `~/.config/ermine/config.toml`. It is
//! constructed once at the top level and passed down by reference to the
//! cache router, resolver, and action engine; there is no ambient global.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Local cache settings
    pub cache: CacheConfig,

    /// Remote registry settings
    pub registry: RegistryConfig,

    /// Artifactory (binary artifact repository) settings
    pub artifactory: ArtifactoryConfig,

    /// Build settings
    pub build: BuildConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Local cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root directory; defaults to `~/.cache/ermine` when unset
    pub root: Option<PathBuf>,

    /// Temp directory for in-flight downloads; defaults to `<root>/tmp`
    pub temp_dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            temp_dir: None,
        }
    }
}

impl CacheConfig {
    /// Effective cache root
    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ermine")
        })
    }

    /// Effective temp directory for downloads
    pub fn temp(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| self.root_dir().join("tmp"))
    }
}

/// Remote registry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry display name
    pub name: String,

    /// Registry base URL; None disables the registry tier
    pub url: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name: "official".to_string(),
            url: None,
        }
    }
}

/// Artifactory settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactoryConfig {
    /// Artifactory repository URL; None disables the tier
    pub url: Option<String>,
}

/// Build settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Maximum concurrent fetch/build workers for independent subtrees
    pub jobs: usize,

    /// Erlang/OTP version override; detected from `erl` when unset
    pub erlang_version: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            jobs: 4,
            erlang_version: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[registry]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.registry.name, "official");
        assert_eq!(config.build.jobs, 4);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [registry]
            url = "https://pkg.example.com"

            [build]
            jobs = 8
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.registry.url.as_deref(), Some("https://pkg.example.com"));
        assert_eq!(config.build.jobs, 8);
        assert_eq!(config.registry.name, "official"); // default preserved
    }

    #[test]
    fn cache_root_override() {
        let config: Config = toml::from_str("[cache]\nroot = \"/tmp/ermine-cache\"").unwrap();
        assert_eq!(config.cache.root_dir(), PathBuf::from("/tmp/ermine-cache"));
        assert_eq!(config.cache.temp(), PathBuf::from("/tmp/ermine-cache/tmp"));
    }
}
