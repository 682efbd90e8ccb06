//! Config dialect detection and normalization
//!
//! A project describes itself in one of several dialects; each normalizes
//! into the same `PackageConfig`. Detection uses a fixed precedence: the
//! native `ermine.json` wins over a Makefile when both are present.

pub mod makefile;
pub mod native;

use crate::error::{ErmineError, ErmineResult};
use crate::package::config::PackageConfig;
use std::path::Path;
use tracing::debug;

/// Recognized project-description dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectKind {
    /// Native `ermine.json`
    Native,
    /// erlang.mk style Makefile
    ErlangMk,
}

impl DialectKind {
    /// The config file this dialect reads
    pub fn config_file(&self) -> &'static str {
        match self {
            Self::Native => "ermine.json",
            Self::ErlangMk => "Makefile",
        }
    }
}

/// Detect the dialect of a source tree. Native dialect first.
pub fn detect(dir: &Path) -> ErmineResult<DialectKind> {
    for kind in [DialectKind::Native, DialectKind::ErlangMk] {
        if dir.join(kind.config_file()).exists() {
            debug!("detected {:?} dialect in {}", kind, dir.display());
            return Ok(kind);
        }
    }
    Err(ErmineError::ConfigNotFound(dir.to_path_buf()))
}

/// Normalize a source tree's config, whatever its dialect.
///
/// The directory name is the fallback package name when the config does
/// not declare one.
pub fn normalize_dir(dir: &Path) -> ErmineResult<PackageConfig> {
    let default_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());

    match detect(dir)? {
        DialectKind::Native => {
            let path = dir.join("ermine.json");
            let content = std::fs::read_to_string(&path)
                .map_err(|e| ErmineError::io(format!("reading {}", path.display()), e))?;
            native::parse(&content, &default_name)
                .map_err(|e| match e {
                    e @ ErmineError::ConfigInvalid { .. } => e,
                    e @ ErmineError::UnknownAction(_) => e,
                    other => ErmineError::config(&path, other.to_string()),
                })
        }
        DialectKind::ErlangMk => makefile::parse(dir, &default_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn native_wins_over_makefile() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("ermine.json"), "{}").unwrap();
        fs::write(temp.path().join("Makefile"), "PROJECT = x\n").unwrap();

        assert_eq!(detect(temp.path()).unwrap(), DialectKind::Native);
    }

    #[test]
    fn makefile_detected_alone() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("Makefile"), "PROJECT = x\n").unwrap();

        assert_eq!(detect(temp.path()).unwrap(), DialectKind::ErlangMk);
    }

    #[test]
    fn no_config_is_fatal() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            detect(temp.path()),
            Err(ErmineError::ConfigNotFound(_))
        ));
    }

    #[test]
    fn normalize_uses_dir_name_as_fallback() {
        let temp = TempDir::new().unwrap();
        let proj = temp.path().join("fallback_app");
        fs::create_dir_all(&proj).unwrap();
        fs::write(proj.join("ermine.json"), "{}").unwrap();

        let config = normalize_dir(&proj).unwrap();
        assert_eq!(config.name, "fallback_app");
    }
}
