//! Raw VCS fallback
//!
//! When no cache tier has a package, the router clones it straight from
//! its declared repository URL. The clone lands in the build workspace
//! and its config is normalized from the checked-out source tree.

use crate::error::{ErmineError, ErmineResult};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Shallow-clone `url` at `version_ref` into `dest`
pub async fn clone_into(url: &str, version_ref: &str, dest: &Path) -> ErmineResult<()> {
    if dest.exists() {
        debug!("{} already checked out, skipping clone", dest.display());
        return Ok(());
    }

    info!("cloning {} at {}", url, version_ref);
    let output = Command::new("git")
        .args([
            "clone",
            "--depth",
            "1",
            "--branch",
            version_ref,
            url,
        ])
        .arg(dest)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| ErmineError::command_failed(format!("git clone {}", url), e))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ErmineError::command_exec(
            format!("git clone {}", url),
            stderr.to_string(),
        ))
    }
}
