//! Normalized package configuration
//!
//! Every supported dialect (native `ermine.json`, erlang.mk Makefile)
//! normalizes into this one model. The config is immutable after
//! normalization except for the single controlled `fullname` override
//! applied when archive metadata takes precedence (see `set_fullname`).

use crate::actions::Action;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compiler used to build a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compiler {
    /// Native ermine project, built with erlc
    Erlc,
    /// erlang.mk project, built with make
    ErlangMk,
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Erlc => write!(f, "erlc"),
            Self::ErlangMk => write!(f, "erlang.mk"),
        }
    }
}

/// A compiler build variable: either a bare flag or a key=value pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildVar {
    /// `-DNAME`
    Flag(String),
    /// `-DNAME=VALUE`
    KeyValue(String, String),
}

impl BuildVar {
    /// Render as an erlc `-D` argument
    pub fn to_erlc_arg(&self) -> String {
        match self {
            Self::Flag(k) => format!("-D{}", k),
            Self::KeyValue(k, v) => format!("-D{}={}", k, v),
        }
    }
}

/// Where a dependency's bytes come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepSource {
    /// A version-control repository URL
    Vcs { url: String },
    /// Resolved by name+tag against the public package index
    Index,
}

/// Version selector for a dependency. When both a tag and a branch could
/// apply, the tag is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionSelector {
    Tag(String),
    Branch(String),
}

impl VersionSelector {
    /// The version-control reference this selector resolves to
    pub fn as_ref_str(&self) -> &str {
        match self {
            Self::Tag(t) => t,
            Self::Branch(b) => b,
        }
    }
}

/// A single declared dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dep {
    /// Short name, unique within the declaring scope
    pub name: String,
    /// Source of the dependency's bytes
    pub source: DepSource,
    /// Version selector (tag wins over branch)
    pub selector: VersionSelector,
}

impl Dep {
    /// Create a VCS dependency. Tag is authoritative when both are given.
    pub fn vcs(
        name: impl Into<String>,
        url: impl Into<String>,
        tag: Option<String>,
        branch: Option<String>,
    ) -> Option<Self> {
        let selector = match (tag, branch) {
            (Some(t), _) => VersionSelector::Tag(t),
            (None, Some(b)) => VersionSelector::Branch(b),
            (None, None) => return None,
        };
        Some(Self {
            name: name.into(),
            source: DepSource::Vcs { url: url.into() },
            selector,
        })
    }

    /// Create an index dependency, looked up by name+tag
    pub fn index(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: DepSource::Index,
            selector: VersionSelector::Tag(tag.into()),
        }
    }

    /// Globally-qualifying identifier used as the cache lookup key.
    ///
    /// For VCS deps this is the last two path segments of the URL
    /// (`owner/name`); index deps are keyed by bare name.
    pub fn fullname(&self) -> String {
        match &self.source {
            DepSource::Vcs { url } => fullname_from_url(url, &self.name),
            DepSource::Index => self.name.clone(),
        }
    }
}

/// Derive `owner/name` from a repository URL, falling back to the dep name
pub fn fullname_from_url(url: &str, name: &str) -> String {
    let trimmed = url.trim_end_matches('/').trim_end_matches(".git");
    let mut segments: Vec<&str> = trimmed
        .rsplit('/')
        .take(2)
        .collect();
    segments.reverse();
    match segments.as_slice() {
        [owner, repo] if !owner.contains(':') && !owner.is_empty() => {
            format!("{}/{}", owner, repo)
        }
        _ => name.to_string(),
    }
}

/// Normalized package configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PackageConfig {
    /// Short package name
    pub name: String,
    /// Globally-qualifying identifier, if known
    pub fullname: Option<String>,
    /// Application version
    pub app_vsn: Option<String>,
    /// Git tag of this package itself
    pub tag: Option<String>,
    /// Git branch of this package itself
    pub branch: Option<String>,
    /// Repository URL of this package itself
    pub url: Option<String>,
    /// Declared runtime dependencies, in declaration order
    pub deps: Vec<Dep>,
    /// Declared test-only dependencies
    pub test_deps: Vec<Dep>,
    /// Compiler build variables
    pub build_vars: Vec<BuildVar>,
    /// C compiler build variables (NIF builds)
    pub c_build_vars: Vec<BuildVar>,
    /// Which compiler builds this package
    pub compiler: Compiler,
    /// Supported Erlang/OTP versions
    pub erlang_versions: Vec<String>,
    /// Silently skip deps no tier can satisfy
    pub drop_unknown_deps: bool,
    /// Let the resolver compute build order (vs. trusting declared order)
    pub auto_build_order: bool,
    /// Whether a version mismatch against an already-resolved dep is fatal
    pub compare_versions: bool,
    /// Include source in the packaged archive
    pub with_source: bool,
    /// Link all deps into the release
    pub link_all: bool,
    /// Rescan deps after prebuild
    pub rescan_deps: bool,
    /// This config overrides dep-declared configs
    pub override_conf: bool,
    /// Skip the prebuild phase entirely
    pub disable_prebuild: bool,
    /// Prebuild steps, run before compilation
    pub prebuild: Vec<Action>,
    /// Install steps, run after successful compilation
    pub install: Vec<Action>,
    /// Uninstall steps, run only on explicit teardown
    pub uninstall: Vec<Action>,
}

impl PackageConfig {
    /// A minimal config with the dialect-wide defaults applied
    pub fn with_defaults(name: impl Into<String>, compiler: Compiler) -> Self {
        Self {
            name: name.into(),
            fullname: None,
            app_vsn: None,
            tag: None,
            branch: None,
            url: None,
            deps: Vec::new(),
            test_deps: Vec::new(),
            build_vars: Vec::new(),
            c_build_vars: Vec::new(),
            compiler,
            erlang_versions: Vec::new(),
            drop_unknown_deps: true,
            auto_build_order: true,
            compare_versions: true,
            with_source: true,
            link_all: true,
            rescan_deps: false,
            override_conf: false,
            disable_prebuild: false,
            prebuild: Vec::new(),
            install: Vec::new(),
            uninstall: Vec::new(),
        }
    }

    /// The single controlled fullname override: the requesting dep's
    /// declared fullname takes precedence over archive/path-derived naming.
    pub fn set_fullname(&mut self, fullname: String) {
        self.fullname = Some(fullname);
    }

    /// The version this config declares for the package itself
    pub fn version_ref(&self) -> Option<&str> {
        self.tag
            .as_deref()
            .or(self.branch.as_deref())
            .or(self.app_vsn.as_deref())
    }
}
