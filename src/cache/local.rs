//! Local disk cache tier
//!
//! Entries live under a deterministic path derived from the cache key:
//! `<root>/<fullname>/<version>/<name>.ep`, with a small `entry.toml`
//! sidecar recording the archive checksum and creation time. Entries are
//! never mutated in place; a changed version is a new entry.

use crate::archive;
use crate::cache::{CacheTier, Fetched};
use crate::error::{ErmineError, ErmineResult};
use crate::package::Package;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Sidecar metadata for one cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMeta {
    /// SHA256 of the archive bytes
    pub checksum: String,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
}

/// Local on-disk cache
#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
}

impl LocalCache {
    /// Create a local cache rooted at `root`
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for one cache key
    pub fn entry_dir(&self, fullname: &str, version: &str) -> PathBuf {
        self.root.join(fullname).join(version)
    }

    /// Archive path for one cache key
    pub fn archive_path(&self, fullname: &str, version: &str) -> PathBuf {
        let name = fullname.rsplit('/').next().unwrap_or(fullname);
        self.entry_dir(fullname, version).join(format!("{}.ep", name))
    }

    fn meta_path(&self, fullname: &str, version: &str) -> PathBuf {
        self.entry_dir(fullname, version).join("entry.toml")
    }

    fn write_meta(&self, fullname: &str, version: &str, archive: &Path) -> ErmineResult<()> {
        let bytes = std::fs::read(archive)
            .map_err(|e| ErmineError::io(format!("reading {}", archive.display()), e))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let meta = EntryMeta {
            checksum: hex::encode(hasher.finalize()),
            created_at: Utc::now(),
        };

        let content = toml::to_string_pretty(&meta)?;
        std::fs::write(self.meta_path(fullname, version), content)
            .map_err(|e| ErmineError::io("writing cache entry metadata", e))?;
        Ok(())
    }

    /// Read an entry's sidecar metadata, if present
    pub fn read_meta(&self, fullname: &str, version: &str) -> Option<EntryMeta> {
        let content = std::fs::read_to_string(self.meta_path(fullname, version)).ok()?;
        toml::from_str(&content).ok()
    }
}

#[async_trait]
impl CacheTier for LocalCache {
    fn tier_name(&self) -> &'static str {
        "local"
    }

    fn writable(&self) -> bool {
        true
    }

    async fn exists(&self, fullname: &str, version: &str) -> ErmineResult<bool> {
        Ok(self.archive_path(fullname, version).exists())
    }

    async fn fetch(&self, package: &Package, workspace: &Path) -> ErmineResult<Option<Fetched>> {
        let Some((fullname, version)) = package.cache_key() else {
            return Ok(None);
        };
        let archive_path = self.archive_path(fullname, version);
        if !archive_path.exists() {
            return Ok(None);
        }

        let dest = workspace.join(&package.name);
        let unpacked =
            Package::from_archive(&archive_path, &dest, package.fullname.as_deref())?;

        debug!("local cache hit for {}:{}", fullname, version);
        let config = unpacked.config().cloned().ok_or_else(|| {
            ErmineError::Internal(format!("unpacked {} has no config", package.name))
        })?;
        Ok(Some(Fetched {
            local_path: dest,
            config,
        }))
    }

    async fn publish(&self, package: &Package, overwrite: bool) -> ErmineResult<bool> {
        let Some((fullname, version)) = package.cache_key() else {
            return Err(ErmineError::Internal(format!(
                "cannot publish {} without a cache key",
                package.name
            )));
        };
        let local_path = package.local_path().ok_or_else(|| {
            ErmineError::Internal(format!("cannot publish unmaterialized {}", package.name))
        })?;

        let archive_path = self.archive_path(fullname, version);
        if archive_path.exists() && !overwrite {
            debug!("{}:{} already cached, skipping publish", fullname, version);
            return Ok(false);
        }

        let entry_dir = self.entry_dir(fullname, version);
        std::fs::create_dir_all(&entry_dir)
            .map_err(|e| ErmineError::io(format!("creating {}", entry_dir.display()), e))?;

        archive::write_package(local_path, &archive_path, Some(&package.config_json()?))?;
        self.write_meta(fullname, version, &archive_path)?;

        info!("published {}:{} to local cache", fullname, version);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn materialized_package(dir: &Path, name: &str, fullname: &str, vsn: &str) -> Package {
        let proj = dir.join(name);
        fs::create_dir_all(&proj).unwrap();
        fs::write(
            proj.join("ermine.json"),
            format!(
                r#"{{"name": "{}", "fullname": "{}", "app_vsn": "{}"}}"#,
                name, fullname, vsn
            ),
        )
        .unwrap();
        Package::from_path(&proj).unwrap()
    }

    #[tokio::test]
    async fn publish_then_exists_then_fetch() {
        let temp = TempDir::new().unwrap();
        let cache = LocalCache::new(temp.path().join("cache"));
        let package = materialized_package(temp.path(), "myapp", "me/myapp", "1.0.0");

        assert!(!cache.exists("me/myapp", "1.0.0").await.unwrap());
        assert!(cache.publish(&package, false).await.unwrap());
        assert!(cache.exists("me/myapp", "1.0.0").await.unwrap());

        let workspace = temp.path().join("deps");
        fs::create_dir_all(&workspace).unwrap();
        let fetched = cache.fetch(&package, &workspace).await.unwrap().unwrap();
        assert_eq!(fetched.local_path, workspace.join("myapp"));
        assert_eq!(fetched.config.name, "myapp");
        assert!(workspace.join("myapp").join("ermine.json").exists());
    }

    #[tokio::test]
    async fn publish_refuses_without_overwrite() {
        let temp = TempDir::new().unwrap();
        let cache = LocalCache::new(temp.path().join("cache"));
        let package = materialized_package(temp.path(), "myapp", "me/myapp", "1.0.0");

        assert!(cache.publish(&package, false).await.unwrap());
        assert!(!cache.publish(&package, false).await.unwrap());
        assert!(cache.publish(&package, true).await.unwrap());
    }

    #[tokio::test]
    async fn fetch_miss_is_none() {
        let temp = TempDir::new().unwrap();
        let cache = LocalCache::new(temp.path().join("cache"));
        let package = Package::from_cache_entry("ghost/ghost", "0.0.1");

        let fetched = cache.fetch(&package, temp.path()).await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn entry_meta_recorded() {
        let temp = TempDir::new().unwrap();
        let cache = LocalCache::new(temp.path().join("cache"));
        let package = materialized_package(temp.path(), "myapp", "me/myapp", "1.0.0");

        cache.publish(&package, false).await.unwrap();
        let meta = cache.read_meta("me/myapp", "1.0.0").unwrap();
        assert_eq!(meta.checksum.len(), 64);
    }

    #[test]
    fn deterministic_layout() {
        let cache = LocalCache::new(PathBuf::from("/var/cache/ermine"));
        assert_eq!(
            cache.archive_path("ninenines/cowboy", "2.9.0"),
            PathBuf::from("/var/cache/ermine/ninenines/cowboy/2.9.0/cowboy.ep")
        );
    }
}
