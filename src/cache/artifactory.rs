//! Artifactory cache tier (contract boundary)
//!
//! The value of this tier is the remote service itself, not local logic;
//! the operations are specified but report misses until a backend is
//! wired up against a real repository instance.

use crate::cache::{CacheTier, Fetched};
use crate::error::ErmineResult;
use crate::package::Package;
use async_trait::async_trait;
use std::path::Path;
use tracing::warn;

/// Binary-artifact repository tier
#[derive(Debug, Clone)]
pub struct ArtifactoryCache {
    url: String,
}

impl ArtifactoryCache {
    /// Create an artifactory tier against a repository URL
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The configured repository URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CacheTier for ArtifactoryCache {
    fn tier_name(&self) -> &'static str {
        "artifactory"
    }

    async fn exists(&self, _fullname: &str, _version: &str) -> ErmineResult<bool> {
        Ok(false)
    }

    async fn fetch(&self, _package: &Package, _workspace: &Path) -> ErmineResult<Option<Fetched>> {
        Ok(None)
    }

    async fn publish(&self, package: &Package, _overwrite: bool) -> ErmineResult<bool> {
        warn!(
            "artifactory publish of {} to {} is not implemented",
            package.name, self.url
        );
        Ok(false)
    }
}
