//! Package model
//!
//! A `Package` is one dependency unit: identity, version ref, source
//! location, and (once known) its normalized config and on-disk location.
//! Instead of in-place mutation from multiple call sites, materialization
//! is an explicit state machine owned by the resolver and cache router:
//! `Unresolved → Located(local_path) → Configured`.

pub mod config;
pub mod dialect;

pub use config::{BuildVar, Compiler, Dep, DepSource, PackageConfig, VersionSelector};

use crate::archive;
use crate::error::{ErmineError, ErmineResult};
use std::path::{Path, PathBuf};

/// Where a package's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// A version-control repository URL
    Url(String),
    /// A local source tree
    Path(PathBuf),
    /// A local `.ep` archive
    Archive(PathBuf),
}

/// Materialization state of a package
#[derive(Debug, Clone)]
pub enum PackageState {
    /// Identity only; nothing on disk yet
    Unresolved,
    /// Bytes staged on disk, config not yet normalized
    Located { local_path: PathBuf },
    /// Fully materialized
    Configured {
        local_path: PathBuf,
        config: PackageConfig,
    },
}

/// One dependency unit
#[derive(Debug, Clone)]
pub struct Package {
    /// Short name, unique within the declaring scope
    pub name: String,
    /// Globally-qualifying cache lookup key, when known
    pub fullname: Option<String>,
    /// Version-control ref or version string
    pub version_ref: Option<String>,
    /// Declared source, used by the raw-VCS fallback
    pub source_location: Option<SourceLocation>,
    state: PackageState,
}

impl Package {
    /// Construct from a source tree, normalizing its config.
    ///
    /// No network I/O: only local bytes already staged by a cache tier are
    /// read. The directory name is the fallback package name.
    pub fn from_path(path: &Path) -> ErmineResult<Self> {
        let config = dialect::normalize_dir(path)?;

        let fullname = config
            .fullname
            .clone()
            .or_else(|| {
                config
                    .url
                    .as_deref()
                    .map(|u| config::fullname_from_url(u, &config.name))
            });

        Ok(Self {
            name: config.name.clone(),
            fullname,
            version_ref: config.version_ref().map(String::from),
            source_location: Some(SourceLocation::Path(path.to_path_buf())),
            state: PackageState::Configured {
                local_path: path.to_path_buf(),
                config,
            },
        })
    }

    /// Construct from an `.ep` archive, unpacking into `dest`.
    ///
    /// `fullname_override` is the requesting dep's declared fullname; it
    /// takes precedence over the archive's embedded naming (the single
    /// controlled config override).
    pub fn from_archive(
        archive_path: &Path,
        dest: &Path,
        fullname_override: Option<&str>,
    ) -> ErmineResult<Self> {
        let embedded = archive::read_embedded_config(archive_path)?;
        let default_name = archive_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());

        let mut config = dialect::native::parse(&embedded, &default_name)
            .map_err(|e| ErmineError::ArchiveInvalid {
                path: archive_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if let Some(fullname) = fullname_override {
            config.set_fullname(fullname.to_string());
        }

        archive::unpack(archive_path, dest)?;

        Ok(Self {
            name: config.name.clone(),
            fullname: config.fullname.clone(),
            version_ref: config.version_ref().map(String::from),
            source_location: Some(SourceLocation::Archive(archive_path.to_path_buf())),
            state: PackageState::Configured {
                local_path: dest.to_path_buf(),
                config,
            },
        })
    }

    /// Rehydrate identity from a prior cache entry without re-normalizing
    pub fn from_cache_entry(fullname: &str, version: &str) -> Self {
        let name = fullname.rsplit('/').next().unwrap_or(fullname).to_string();
        Self {
            name,
            fullname: Some(fullname.to_string()),
            version_ref: Some(version.to_string()),
            source_location: None,
            state: PackageState::Unresolved,
        }
    }

    /// Construct an unresolved child package from a dependency declaration
    pub fn from_dep(dep: &Dep) -> Self {
        let source_location = match &dep.source {
            DepSource::Vcs { url } => Some(SourceLocation::Url(url.clone())),
            DepSource::Index => None,
        };
        Self {
            name: dep.name.clone(),
            fullname: Some(dep.fullname()),
            version_ref: Some(dep.selector.as_ref_str().to_string()),
            source_location,
            state: PackageState::Unresolved,
        }
    }

    /// Transition `Unresolved → Located`. Fetch is the only caller.
    pub fn locate(mut self, local_path: PathBuf) -> ErmineResult<Self> {
        match self.state {
            PackageState::Unresolved => {
                self.state = PackageState::Located { local_path };
                Ok(self)
            }
            _ => Err(ErmineError::Internal(format!(
                "package {} located twice",
                self.name
            ))),
        }
    }

    /// Transition `Located → Configured`
    pub fn configure(mut self, config: PackageConfig) -> ErmineResult<Self> {
        match self.state {
            PackageState::Located { local_path } => {
                if self.fullname.is_none() {
                    self.fullname = config.fullname.clone();
                }
                self.state = PackageState::Configured { local_path, config };
                Ok(self)
            }
            _ => Err(ErmineError::Internal(format!(
                "package {} configured out of order",
                self.name
            ))),
        }
    }

    /// Filesystem location once materialized
    pub fn local_path(&self) -> Option<&Path> {
        match &self.state {
            PackageState::Unresolved => None,
            PackageState::Located { local_path }
            | PackageState::Configured { local_path, .. } => Some(local_path),
        }
    }

    /// Normalized config once materialized
    pub fn config(&self) -> Option<&PackageConfig> {
        match &self.state {
            PackageState::Configured { config, .. } => Some(config),
            _ => None,
        }
    }

    /// Whether the package is fully materialized
    pub fn is_configured(&self) -> bool {
        matches!(self.state, PackageState::Configured { .. })
    }

    /// `fullname` + version: the cache content key
    pub fn cache_key(&self) -> Option<(&str, &str)> {
        match (self.fullname.as_deref(), self.version_ref.as_deref()) {
            (Some(f), Some(v)) => Some((f, v)),
            _ => None,
        }
    }

    /// Serialized native config for embedding into an archive
    pub fn config_json(&self) -> ErmineResult<String> {
        let config = self.config().ok_or_else(|| {
            ErmineError::Internal(format!("package {} has no config to export", self.name))
        })?;
        let value = dialect::native::export(config);
        serde_json::to_string_pretty(&value).map_err(ErmineError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_native(dir: &Path, json: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("ermine.json"), json).unwrap();
    }

    #[test]
    fn from_path_reads_native_config() {
        let temp = TempDir::new().unwrap();
        let proj = temp.path().join("myapp");
        write_native(
            &proj,
            r#"{"name": "myapp", "app_vsn": "1.2.0", "fullname": "me/myapp"}"#,
        );

        let package = Package::from_path(&proj).unwrap();
        assert_eq!(package.name, "myapp");
        assert_eq!(package.fullname.as_deref(), Some("me/myapp"));
        assert_eq!(package.version_ref.as_deref(), Some("1.2.0"));
        assert!(package.is_configured());
    }

    #[test]
    fn from_path_derives_fullname_from_url() {
        let temp = TempDir::new().unwrap();
        let proj = temp.path().join("myapp");
        write_native(
            &proj,
            r#"{"name": "myapp", "url": "https://github.com/me/myapp.git"}"#,
        );

        let package = Package::from_path(&proj).unwrap();
        assert_eq!(package.fullname.as_deref(), Some("me/myapp"));
    }

    #[test]
    fn from_path_missing_config_is_fatal() {
        let temp = TempDir::new().unwrap();
        let proj = temp.path().join("empty");
        fs::create_dir_all(&proj).unwrap();

        let err = Package::from_path(&proj).unwrap_err();
        assert!(matches!(err, ErmineError::ConfigNotFound(_)));
    }

    #[test]
    fn from_cache_entry_rehydrates_identity() {
        let package = Package::from_cache_entry("ninenines/cowboy", "2.9.0");
        assert_eq!(package.name, "cowboy");
        assert_eq!(package.cache_key(), Some(("ninenines/cowboy", "2.9.0")));
        assert!(!package.is_configured());
    }

    #[test]
    fn state_transitions_in_order() {
        let package = Package::from_cache_entry("a/b", "1.0");
        let located = package.locate(PathBuf::from("/tmp/b")).unwrap();
        assert_eq!(located.local_path(), Some(Path::new("/tmp/b")));
        assert!(located.config().is_none());

        let config = PackageConfig::with_defaults("b", Compiler::Erlc);
        let configured = located.configure(config).unwrap();
        assert!(configured.is_configured());
    }

    #[test]
    fn double_locate_rejected() {
        let package = Package::from_cache_entry("a/b", "1.0");
        let located = package.locate(PathBuf::from("/tmp/b")).unwrap();
        assert!(located.locate(PathBuf::from("/tmp/other")).is_err());
    }

    #[test]
    fn archive_round_trip_preserves_config() {
        let temp = TempDir::new().unwrap();
        let proj = temp.path().join("myapp");
        write_native(
            &proj,
            r#"{
                "name": "myapp",
                "app_vsn": "0.1.0",
                "build_vars": [{"FOO": "qux"}, "BAZ"],
                "deps": [{"name": "cowboy", "url": "https://github.com/ninenines/cowboy", "tag": "2.9.0"}],
                "prebuild": [{"shell": "make generate"}]
            }"#,
        );

        let original = Package::from_path(&proj).unwrap();
        let archive_path = temp.path().join("myapp.ep");
        crate::archive::write_package(
            &proj,
            &archive_path,
            Some(&original.config_json().unwrap()),
        )
        .unwrap();

        let unpacked = temp.path().join("unpacked");
        let restored = Package::from_archive(&archive_path, &unpacked, None).unwrap();
        assert_eq!(restored.config().unwrap(), original.config().unwrap());
    }

    #[test]
    fn from_archive_fullname_override() {
        let temp = TempDir::new().unwrap();
        let proj = temp.path().join("myapp");
        write_native(&proj, r#"{"name": "myapp", "app_vsn": "0.1.0"}"#);

        let original = Package::from_path(&proj).unwrap();
        let archive_path = temp.path().join("myapp.ep");
        crate::archive::write_package(
            &proj,
            &archive_path,
            Some(&original.config_json().unwrap()),
        )
        .unwrap();

        let unpacked = temp.path().join("unpacked");
        let restored =
            Package::from_archive(&archive_path, &unpacked, Some("declared/myapp")).unwrap();
        assert_eq!(restored.fullname.as_deref(), Some("declared/myapp"));
    }
}
