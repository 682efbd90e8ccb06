//! Tiered package cache
//!
//! Four backends sit behind one contract: local disk, the remote
//! registry, an Artifactory-style binary repository, and raw git clones
//! as the final fallback. The router probes tiers in priority order and
//! writes fetched packages through to the local tier.
//!
//! A tier miss is a value (`false` / `None`), never an error.

pub mod artifactory;
pub mod local;
pub mod registry;
pub mod router;
pub mod vcs;

pub use artifactory::ArtifactoryCache;
pub use local::LocalCache;
pub use registry::RegistryCache;
pub use router::CacheRouter;

use crate::error::ErmineResult;
use crate::package::{Package, PackageConfig};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// The result of a successful tier fetch: where the bytes landed and the
/// config read from the fetched metadata. The router applies the state
/// transition; tiers never mutate the package.
#[derive(Debug)]
pub struct Fetched {
    /// Workspace location of the materialized package
    pub local_path: PathBuf,
    /// Config normalized from the fetched metadata
    pub config: PackageConfig,
}

/// One storage/retrieval backend
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Human-readable tier name for logs
    fn tier_name(&self) -> &'static str;

    /// Whether this tier accepts `publish`
    fn writable(&self) -> bool {
        false
    }

    /// Existence check by cache key
    async fn exists(&self, fullname: &str, version: &str) -> ErmineResult<bool>;

    /// Materialize the package into the workspace. `Ok(None)` is a miss.
    async fn fetch(&self, package: &Package, workspace: &Path) -> ErmineResult<Option<Fetched>>;

    /// Store a materialized package. Returns false when refused (entry
    /// present and `overwrite` unset, or the tier is read-only).
    async fn publish(&self, package: &Package, overwrite: bool) -> ErmineResult<bool>;
}
