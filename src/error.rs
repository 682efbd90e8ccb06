//! Error types for Ermine
//!
//! All modules use `ErmineResult<T>` as their return type. Cache tier
//! misses are `Ok(None)`/`false` values, never errors; only structural
//! and fatal conditions travel through this enum.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Ermine operations
pub type ErmineResult<T> = Result<T, ErmineError>;

/// All errors that can occur in Ermine
#[derive(Error, Debug)]
pub enum ErmineError {
    // Configuration errors
    #[error("Invalid package config at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("No package config found in {0} (expected ermine.json or Makefile)")]
    ConfigNotFound(PathBuf),

    #[error("Unknown build action type: {0}")]
    UnknownAction(String),

    #[error("Unresolved Makefile variable: {0}")]
    UnresolvedVar(String),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Resolution errors
    #[error("Dependency not found in any cache tier: {0}")]
    DependencyNotFound(String),

    #[error("Version conflict for {fullname}: {wanted} requested but {resolved} already resolved")]
    VersionConflict {
        fullname: String,
        wanted: String,
        resolved: String,
    },

    #[error("Cyclic dependency: {0}")]
    CyclicDependency(String),

    // Registry errors
    #[error("No registry configured, but this step requires one")]
    RegistryUnavailable,

    #[error("No such Erlang runtime version: {0}")]
    NoSuchRuntime(String),

    #[error("Registry request to {url} failed: {reason}")]
    Registry { url: String, reason: String },

    // Archive errors
    #[error("Invalid package archive {path}: {reason}")]
    ArchiveInvalid { path: PathBuf, reason: String },

    // Build errors
    #[error("Build interrupted before completion")]
    Interrupted,

    #[error("Build failed for {fullname} during {phase}: {reason}")]
    BuildFailed {
        fullname: String,
        phase: String,
        reason: String,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ErmineError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a package config error
    pub fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts resolution before any build step runs
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::CyclicDependency(_)
                | Self::VersionConflict { .. }
                | Self::DependencyNotFound(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound(_) => Some("Run: ermine init, or add an ermine.json"),
            Self::RegistryUnavailable => {
                Some("Set registry.url in ~/.config/ermine/config.toml")
            }
            Self::DependencyNotFound(_) => {
                Some("Check the dep's url/tag, or set drop_unknown_deps = true")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ErmineError::DependencyNotFound("comte/mnesia_ext".to_string());
        assert!(err.to_string().contains("comte/mnesia_ext"));
    }

    #[test]
    fn error_hint() {
        let err = ErmineError::RegistryUnavailable;
        assert!(err.hint().unwrap().contains("registry.url"));
    }

    #[test]
    fn structural_errors() {
        assert!(ErmineError::CyclicDependency("a -> b -> a".into()).is_structural());
        assert!(!ErmineError::RegistryUnavailable.is_structural());
    }
}
