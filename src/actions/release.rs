//! Release action: fetch an Erlang runtime and run the release tool
//!
//! Downloads the requested Erlang/OTP runtime release from the registry,
//! unpacks it into the project path, then invokes `relx` to assemble the
//! release. A missing registry fails the step; a nonexistent runtime
//! version is fatal because no other tier can supply a runtime.

use crate::archive;
use crate::cache::router::CacheRouter;
use crate::error::{ErmineError, ErmineResult};
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, warn};

/// Assemble an Erlang release with a fetched runtime
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseAction {
    erlang_version: String,
}

impl ReleaseAction {
    /// Params shape: `{"erlang": "<otp version>"}`
    pub fn from_params(params: &Value) -> ErmineResult<Self> {
        let erlang_version = params
            .get("erlang")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ErmineError::Internal(format!("release step missing 'erlang': {}", params))
            })?
            .to_string();
        Ok(Self { erlang_version })
    }

    /// The serialized params form
    pub fn export_params(&self) -> Value {
        serde_json::json!({ "erlang": self.erlang_version })
    }

    /// Fetch the runtime, unpack it, and run `relx -i .` in `path`.
    pub async fn run(&self, path: &Path, router: &CacheRouter) -> ErmineResult<bool> {
        let registry = match router.registry() {
            Some(r) => r,
            None => {
                warn!("release step requires a registry, but none is configured");
                return Ok(false);
            }
        };

        info!("fetching erts for Erlang {}", self.erlang_version);
        // NoSuchRuntime propagates: an unknown runtime version is fatal
        let erts_archive = registry.fetch_erts(&self.erlang_version).await?;
        archive::unpack_tar(&erts_archive, path)?;

        run_relx(path).await
    }

    /// The runtime version this release targets
    pub fn erlang_version(&self) -> &str {
        &self.erlang_version
    }
}

/// Invoke `relx -i .` in `path`. An unavailable release tool fails the
/// step, like a missing registry, rather than the whole build.
async fn run_relx(path: &Path) -> ErmineResult<bool> {
    run_release_tool("relx", path).await
}

async fn run_release_tool(program: &str, path: &Path) -> ErmineResult<bool> {
    let output = match Command::new(program)
        .args(["-i", "."])
        .current_dir(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            warn!("{} unavailable: {}", program, e);
            return Ok(false);
        }
    };

    if output.status.success() {
        Ok(true)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("{} failed ({}): {}", program, output.status, stderr.trim());
        Ok(false)
    }
}
