//! Build-step actions
//!
//! Actions are the named, parameterized units of build-phase work declared
//! in a package config (`prebuild`/`install`/`uninstall` lists). Each list
//! entry is a single-key `{action_type: params}` record; the tag→variant
//! mapping lives only here at the deserialization boundary.
//!
//! `run` reports external failures as `Ok(false)`, never as errors: a
//! non-zero exit or a missing collaborator fails the step, only genuinely
//! unexpected internal conditions propagate as `Err`.

mod release;
mod shell;

pub use release::ReleaseAction;
pub use shell::ShellAction;

use crate::cache::router::CacheRouter;
use crate::error::{ErmineError, ErmineResult};
use serde_json::Value;
use std::path::Path;

/// A single build step
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Run an external command in the package directory
    Shell(ShellAction),
    /// Fetch an Erlang runtime and run the release packaging tool
    Release(ReleaseAction),
}

impl Action {
    /// Construct an action from a serialized `{action_type: params}` entry.
    /// Unknown action types are a fatal config error.
    pub fn from_step(step: &Value) -> ErmineResult<Self> {
        let obj = step.as_object().ok_or_else(|| {
            ErmineError::Internal(format!("build step is not an object: {}", step))
        })?;
        if obj.len() != 1 {
            return Err(ErmineError::Internal(format!(
                "build step must have exactly one key: {}",
                step
            )));
        }
        let (action_type, params) = obj.iter().next().expect("checked len above");

        match action_type.as_str() {
            "shell" => Ok(Self::Shell(ShellAction::from_params(params)?)),
            "release" => Ok(Self::Release(ReleaseAction::from_params(params)?)),
            other => Err(ErmineError::UnknownAction(other.to_string())),
        }
    }

    /// Round-trip this action back into its serialized config form
    pub fn export(&self) -> Value {
        match self {
            Self::Shell(a) => serde_json::json!({ "shell": a.export_params() }),
            Self::Release(a) => serde_json::json!({ "release": a.export_params() }),
        }
    }

    /// Execute the action in `path`. Returns false on step failure.
    pub async fn run(&self, path: &Path, router: &CacheRouter) -> ErmineResult<bool> {
        match self {
            Self::Shell(a) => a.run(path).await,
            Self::Release(a) => a.run(path, router).await,
        }
    }

    /// Human-readable action name for failure reports
    pub fn name(&self) -> &'static str {
        match self {
            Self::Shell(_) => "shell",
            Self::Release(_) => "release",
        }
    }
}

/// Parse an ordered build-step list
pub fn parse_steps(steps: &[Value]) -> ErmineResult<Vec<Action>> {
    steps.iter().map(Action::from_step).collect()
}
