//! Cache router
//!
//! Orders the tiers by priority (local, registry, artifactory), probes
//! them in order with first-hit-wins, writes any non-local fetch through
//! to the local tier, and falls back to a raw VCS clone from the
//! package's declared source when every tier misses.

use crate::cache::{
    vcs, ArtifactoryCache, CacheTier, LocalCache, RegistryCache,
};
use crate::config::Config;
use crate::error::{ErmineError, ErmineResult};
use crate::package::{dialect, Package, SourceLocation};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Priority-ordered fallback across cache tiers
pub struct CacheRouter {
    tiers: Vec<Box<dyn CacheTier>>,
    local: LocalCache,
    registry: Option<RegistryCache>,
    workspace: PathBuf,
    // One lock per cache key so concurrent same-key publishes from
    // sibling workers cannot tear an archive
    publish_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl CacheRouter {
    /// Build the tier stack from the system config
    pub fn new(system: &Config, workspace: PathBuf, erlang_version: &str) -> Self {
        let local = LocalCache::new(system.cache.root_dir());
        let registry = system.registry.url.as_ref().map(|url| {
            RegistryCache::new(
                system.registry.name.clone(),
                url.clone(),
                system.cache.temp(),
                erlang_version,
            )
        });

        let mut tiers: Vec<Box<dyn CacheTier>> = vec![Box::new(local.clone())];
        if let Some(registry) = &registry {
            tiers.push(Box::new(registry.clone()));
        }
        if let Some(url) = &system.artifactory.url {
            tiers.push(Box::new(ArtifactoryCache::new(url.clone())));
        }

        Self {
            tiers,
            local,
            registry,
            workspace,
            publish_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The registry tier, when one is configured
    pub fn registry(&self) -> Option<&RegistryCache> {
        self.registry.as_ref()
    }

    /// The local tier
    pub fn local(&self) -> &LocalCache {
        &self.local
    }

    /// The build workspace packages materialize into
    pub fn workspace(&self) -> &PathBuf {
        &self.workspace
    }

    /// Resolve a package: probe tiers in order, first hit wins, raw VCS
    /// clone as the last resort. Already-configured packages return
    /// unchanged, so repeated resolution does no I/O.
    pub async fn resolve(&self, package: Package) -> ErmineResult<Package> {
        if package.is_configured() {
            return Ok(package);
        }

        if let Some((fullname, version)) = package.cache_key() {
            let fullname = fullname.to_string();
            let version = version.to_string();

            for tier in &self.tiers {
                if !tier.exists(&fullname, &version).await? {
                    continue;
                }
                // exists raced a concurrent eviction or the backend lied:
                // a miss here just falls through to the next tier
                let Some(fetched) = tier.fetch(&package, &self.workspace).await? else {
                    continue;
                };

                debug!("{}:{} resolved from {} tier", fullname, version, tier.tier_name());
                let resolved = package
                    .locate(fetched.local_path)?
                    .configure(fetched.config)?;

                if tier.tier_name() != self.local.tier_name() {
                    self.publish_local(&resolved, false).await?;
                }
                return Ok(resolved);
            }
        }

        self.resolve_from_source(package).await
    }

    /// Raw VCS fallback from the declared source location
    async fn resolve_from_source(&self, package: Package) -> ErmineResult<Package> {
        let identity = package
            .fullname
            .clone()
            .unwrap_or_else(|| package.name.clone());

        let source = package.source_location.clone();
        let version_ref = package.version_ref.clone();

        match (source, version_ref) {
            (Some(SourceLocation::Url(url)), Some(version_ref)) => {
                let dest = self.workspace.join(&package.name);
                vcs::clone_into(&url, &version_ref, &dest).await?;

                let config = dialect::normalize_dir(&dest)?;
                info!("{} resolved from raw VCS clone", identity);
                package.locate(dest)?.configure(config)
            }
            (Some(SourceLocation::Path(path)), _) => {
                let config = dialect::normalize_dir(&path)?;
                package.locate(path)?.configure(config)
            }
            _ => Err(ErmineError::DependencyNotFound(identity)),
        }
    }

    /// Publish to the local tier under a per-key lock; same-key publishes
    /// from sibling workers serialize, different keys proceed in parallel.
    pub async fn publish_local(&self, package: &Package, overwrite: bool) -> ErmineResult<bool> {
        let key = match package.cache_key() {
            Some((fullname, version)) => format!("{}:{}", fullname, version),
            None => {
                return Err(ErmineError::Internal(format!(
                    "cannot publish {} without a cache key",
                    package.name
                )))
            }
        };

        let lock = {
            let mut locks = self
                .publish_locks
                .lock()
                .expect("publish lock map poisoned");
            locks
                .entry(key)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        let _guard = lock.lock().await;

        self.local.publish(package, overwrite).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_config(root: &Path) -> Config {
        let mut config = Config::default();
        config.cache.root = Some(root.join("cache"));
        config
    }

    async fn seed_local_cache(config: &Config, name: &str, fullname: &str, vsn: &str, temp: &Path) {
        let proj = temp.join(format!("seed-{}", name));
        fs::create_dir_all(&proj).unwrap();
        fs::write(
            proj.join("ermine.json"),
            format!(
                r#"{{"name": "{}", "fullname": "{}", "app_vsn": "{}"}}"#,
                name, fullname, vsn
            ),
        )
        .unwrap();
        let package = Package::from_path(&proj).unwrap();

        let local = LocalCache::new(config.cache.root_dir());
        local.publish(&package, false).await.unwrap();
    }

    #[tokio::test]
    async fn resolve_hits_local_tier() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        seed_local_cache(&config, "cowboy", "ninenines/cowboy", "2.9.0", temp.path()).await;

        let workspace = temp.path().join("deps");
        fs::create_dir_all(&workspace).unwrap();
        let router = CacheRouter::new(&config, workspace.clone(), "22.3.0");

        let package = Package::from_cache_entry("ninenines/cowboy", "2.9.0");
        let resolved = router.resolve(package).await.unwrap();

        assert!(resolved.is_configured());
        assert_eq!(resolved.local_path(), Some(workspace.join("cowboy").as_path()));
    }

    #[tokio::test]
    async fn resolve_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        seed_local_cache(&config, "cowboy", "ninenines/cowboy", "2.9.0", temp.path()).await;

        let workspace = temp.path().join("deps");
        fs::create_dir_all(&workspace).unwrap();
        let router = CacheRouter::new(&config, workspace, "22.3.0");

        let first = router
            .resolve(Package::from_cache_entry("ninenines/cowboy", "2.9.0"))
            .await
            .unwrap();
        let first_path = first.local_path().unwrap().to_path_buf();

        // A configured package resolves to itself with no further I/O
        let again = router.resolve(first).await.unwrap();
        assert_eq!(again.local_path(), Some(first_path.as_path()));
    }

    #[tokio::test]
    async fn exhausted_tiers_without_source_is_not_found() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        let router = CacheRouter::new(&config, temp.path().join("deps"), "22.3.0");

        let package = Package::from_cache_entry("ghost/ghost", "0.0.1");
        let err = router.resolve(package).await.unwrap_err();
        assert!(matches!(err, ErmineError::DependencyNotFound(ref n) if n == "ghost/ghost"));
    }

    #[tokio::test]
    async fn path_source_resolves_without_tiers() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        let router = CacheRouter::new(&config, temp.path().join("deps"), "22.3.0");

        let proj = temp.path().join("localdep");
        fs::create_dir_all(&proj).unwrap();
        fs::write(proj.join("ermine.json"), r#"{"name": "localdep"}"#).unwrap();

        let mut package = Package::from_cache_entry("me/localdep", "0.1.0");
        package.source_location = Some(SourceLocation::Path(proj.clone()));

        let resolved = router.resolve(package).await.unwrap();
        assert_eq!(resolved.local_path(), Some(proj.as_path()));
    }

    #[tokio::test]
    async fn publish_local_write_through() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        let router = CacheRouter::new(&config, temp.path().join("deps"), "22.3.0");

        let proj = temp.path().join("myapp");
        fs::create_dir_all(&proj).unwrap();
        fs::write(
            proj.join("ermine.json"),
            r#"{"name": "myapp", "fullname": "me/myapp", "app_vsn": "1.0.0"}"#,
        )
        .unwrap();
        let package = Package::from_path(&proj).unwrap();

        assert!(router.publish_local(&package, false).await.unwrap());
        assert!(router.local().exists("me/myapp", "1.0.0").await.unwrap());
        // Second publish of the same key is refused, not torn
        assert!(!router.publish_local(&package, false).await.unwrap());
    }
}
