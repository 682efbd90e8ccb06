//! Erlang toolchain integration
//!
//! Runtime version detection and per-compiler build invocation. Both
//! shell out: version detection asks a running `erl` first and falls
//! back to the system release file, compilation dispatches on the
//! package's declared compiler.

use crate::error::{ErmineError, ErmineResult};
use crate::package::{Compiler, Package};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

const RELEASES_FILE: &str = "/usr/lib/erlang/releases/RELEASES";

/// Detect the installed Erlang/OTP version.
///
/// Asks `erl` directly; when no runtime is on the PATH, falls back to
/// parsing the system release manifest.
pub async fn detect_erlang_version() -> ErmineResult<String> {
    let probe = Command::new("erl")
        .args([
            "-eval",
            "erlang:display(erlang:system_info(otp_release)), halt().",
            "-noshell",
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await;

    if let Ok(output) = probe {
        if output.status.success() {
            let version = String::from_utf8_lossy(&output.stdout)
                .trim()
                .trim_matches('"')
                .to_string();
            if !version.is_empty() {
                debug!("detected erlang {} via erl", version);
                return Ok(version);
            }
        }
    }

    warn!("no erl on PATH, falling back to {}", RELEASES_FILE);
    version_from_releases(Path::new(RELEASES_FILE))
}

/// Parse the OTP version out of a releases manifest. The file is an
/// Erlang term list; the version is the third comma-separated field.
fn version_from_releases(path: &Path) -> ErmineResult<String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ErmineError::io(format!("reading {}", path.display()), e))?;

    content
        .split(',')
        .nth(2)
        .map(|field| field.trim().trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ErmineError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: "no version field in release manifest".to_string(),
        })
}

/// Compile a materialized package with its declared compiler.
///
/// Returns whether compilation succeeded; compiler diagnostics go to the
/// log, not into the error.
pub async fn compile(package: &Package) -> ErmineResult<bool> {
    let config = package.config().ok_or_else(|| {
        ErmineError::Internal(format!("compiling {} before configuration", package.name))
    })?;
    let path = package.local_path().ok_or_else(|| {
        ErmineError::Internal(format!("compiling unmaterialized {}", package.name))
    })?;

    match config.compiler {
        Compiler::Erlc => compile_erlc(package, path).await,
        Compiler::ErlangMk => compile_make(package, path).await,
    }
}

async fn compile_erlc(package: &Package, path: &Path) -> ErmineResult<bool> {
    if !path.join("src").is_dir() {
        debug!("{} has no src directory, nothing to compile", package.name);
        return Ok(true);
    }

    let config = package.config().expect("checked by caller");
    let var_args: String = config
        .build_vars
        .iter()
        .map(|v| format!("{} ", v.to_erlc_arg()))
        .collect();

    let ebin = path.join("ebin");
    std::fs::create_dir_all(&ebin)
        .map_err(|e| ErmineError::io(format!("creating {}", ebin.display()), e))?;

    // Glob expansion needs a shell
    let command = format!("erlc -o ebin {}src/*.erl", var_args);
    run_build_command(&package.name, path, &command).await
}

async fn compile_make(package: &Package, path: &Path) -> ErmineResult<bool> {
    run_build_command(&package.name, path, "make").await
}

async fn run_build_command(name: &str, cwd: &Path, command: &str) -> ErmineResult<bool> {
    debug!("{}: {}", name, command);
    let output = Command::new("sh")
        .args(["-c", command])
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| ErmineError::command_failed(command.to_string(), e))?;

    if output.status.success() {
        Ok(true)
    } else {
        warn!(
            "{} compile failed: {}",
            name,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn releases_manifest_parses() {
        let temp = TempDir::new().unwrap();
        let manifest = temp.path().join("RELEASES");
        fs::write(
            &manifest,
            r#"[{release,"Erlang/OTP","22.3.4","10.7.1",[],permanent}]."#,
        )
        .unwrap();
        assert_eq!(version_from_releases(&manifest).unwrap(), "22.3.4");
    }

    #[test]
    fn empty_manifest_is_invalid() {
        let temp = TempDir::new().unwrap();
        let manifest = temp.path().join("RELEASES");
        fs::write(&manifest, "").unwrap();
        assert!(version_from_releases(&manifest).is_err());
    }

    #[tokio::test]
    async fn package_without_sources_compiles_trivially() {
        let temp = TempDir::new().unwrap();
        let proj = temp.path().join("empty");
        fs::create_dir_all(&proj).unwrap();
        fs::write(proj.join("ermine.json"), r#"{"name": "empty"}"#).unwrap();

        let package = crate::package::Package::from_path(&proj).unwrap();
        assert!(compile(&package).await.unwrap());
    }
}
