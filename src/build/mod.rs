//! Build orchestrator
//!
//! Drives the full project lifecycle: populate the dependency workspace,
//! build the graph bottom-up with bounded parallelism, package the root
//! into an archive, and publish it. Packages at the same dependency depth
//! build concurrently; a level only starts once the previous one finished.

pub mod erlang;

use crate::actions::Action;
use crate::archive;
use crate::cache::CacheRouter;
use crate::config::Config;
use crate::error::{ErmineError, ErmineResult};
use crate::package::Package;
use crate::resolver::{Resolution, Resolver};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

const PHASE_PREBUILD: &str = "prebuild";
const PHASE_COMPILE: &str = "compile";
const PHASE_INSTALL: &str = "install";
const PHASE_UNINSTALL: &str = "uninstall";

/// Project-level build driver
pub struct Orchestrator {
    project_dir: PathBuf,
    router: CacheRouter,
    jobs: usize,
}

impl Orchestrator {
    /// Set up an orchestrator for the project at `project_dir`.
    ///
    /// The Erlang version comes from the system config when pinned there,
    /// otherwise from toolchain detection; detection failure is tolerated
    /// because only registry build preference depends on it.
    pub async fn new(system: &Config, project_dir: PathBuf) -> Self {
        let erlang_version = match &system.build.erlang_version {
            Some(pinned) => pinned.clone(),
            None => match erlang::detect_erlang_version().await {
                Ok(v) => v,
                Err(e) => {
                    warn!("erlang version detection failed: {}", e);
                    "unknown".to_string()
                }
            },
        };

        let workspace = project_dir.join("deps");
        let router = CacheRouter::new(system, workspace, &erlang_version);
        let jobs = system.build.jobs.max(1);

        Self {
            project_dir,
            router,
            jobs,
        }
    }

    /// The router this orchestrator resolves through
    pub fn router(&self) -> &CacheRouter {
        &self.router
    }

    /// Resolve the project's dependency graph and materialize every
    /// package into the workspace.
    pub async fn populate(&self) -> ErmineResult<Resolution> {
        let root = Package::from_path(&self.project_dir)?;
        Resolver::new(&self.router).resolve(root).await
    }

    /// Build the whole graph bottom-up.
    ///
    /// Ctrl-C stops the build at the next level boundary: nothing new is
    /// scheduled, in-flight packages finish, then the build errors out.
    pub async fn build(&self) -> ErmineResult<()> {
        let interrupt = Arc::new(AtomicBool::new(false));
        let flag = interrupt.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, finishing in-flight builds");
                flag.store(true, Ordering::SeqCst);
            }
        });

        let result = self.build_graph(&interrupt).await;
        watcher.abort();
        result
    }

    /// When the root asks to rescan deps, its prebuild runs before
    /// resolution so generated config lands in the graph.
    async fn build_graph(&self, interrupt: &AtomicBool) -> ErmineResult<()> {
        let mut root = Package::from_path(&self.project_dir)?;
        let mut root_prebuilt = false;

        {
            let config = root.config().expect("from_path configures");
            if config.rescan_deps && !config.disable_prebuild {
                let steps = config.prebuild.clone();
                self.run_steps(&root, PHASE_PREBUILD, &steps).await?;
                root_prebuilt = true;
                root = Package::from_path(&self.project_dir)?;
            }
        }

        let resolution = Resolver::new(&self.router).resolve(root).await?;
        let root_id = resolution.root_identity().to_string();
        let semaphore = Arc::new(Semaphore::new(self.jobs));

        for level in resolution.levels() {
            if interrupt.load(Ordering::SeqCst) {
                return Err(ErmineError::Interrupted);
            }
            let builds = level.iter().map(|package| {
                let semaphore = semaphore.clone();
                let is_root = package.fullname.as_deref().unwrap_or(&package.name) == root_id;
                async move {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|e| ErmineError::Internal(e.to_string()))?;
                    self.build_package(package, is_root, is_root && root_prebuilt)
                        .await
                }
            });

            // Everything in flight finishes before a failure propagates
            let results = futures_util::future::join_all(builds).await;
            for result in results {
                result?;
            }
        }

        info!("built {} packages", resolution.ordered.len());
        Ok(())
    }

    /// Run one package through its build phases and cache the result
    async fn build_package(
        &self,
        package: &Package,
        is_root: bool,
        skip_prebuild: bool,
    ) -> ErmineResult<()> {
        let config = package.config().ok_or_else(|| {
            ErmineError::Internal(format!("building {} before configuration", package.name))
        })?;

        if !config.disable_prebuild && !skip_prebuild {
            self.run_steps(package, PHASE_PREBUILD, &config.prebuild)
                .await?;
        }

        if !erlang::compile(package).await? {
            return Err(self.phase_failure(package, PHASE_COMPILE, "compiler reported errors"));
        }

        self.run_steps(package, PHASE_INSTALL, &config.install)
            .await?;

        if !is_root && package.cache_key().is_some() {
            self.router.publish_local(package, false).await?;
        }
        Ok(())
    }

    /// Run one phase's steps in declared order; the first refusing step
    /// fails the phase.
    async fn run_steps(
        &self,
        package: &Package,
        phase: &str,
        steps: &[Action],
    ) -> ErmineResult<()> {
        let path = package.local_path().ok_or_else(|| {
            ErmineError::Internal(format!("running steps on unmaterialized {}", package.name))
        })?;

        for step in steps {
            debug!("{} {}: {}", package.name, phase, step.name());
            if !step.run(path, &self.router).await? {
                return Err(self.phase_failure(
                    package,
                    phase,
                    &format!("step {} refused", step.name()),
                ));
            }
        }
        Ok(())
    }

    fn phase_failure(&self, package: &Package, phase: &str, reason: &str) -> ErmineError {
        ErmineError::BuildFailed {
            fullname: package
                .fullname
                .clone()
                .unwrap_or_else(|| package.name.clone()),
            phase: phase.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Archive the project into `<project>/<name>.ep`
    pub fn package(&self) -> ErmineResult<PathBuf> {
        let root = Package::from_path(&self.project_dir)?;
        let dest = self.project_dir.join(format!("{}.ep", root.name));

        archive::write_package(&self.project_dir, &dest, Some(&root.config_json()?))?;
        info!("packaged {} at {}", root.name, dest.display());
        Ok(dest)
    }

    /// Publish the project into the local cache tier. The remote registry
    /// is read-only, so local is the only publish target.
    pub async fn publish(&self, overwrite: bool) -> ErmineResult<bool> {
        let root = Package::from_path(&self.project_dir)?;
        if root.cache_key().is_none() {
            return Err(ErmineError::ConfigInvalid {
                path: self.project_dir.clone(),
                reason: "publishing needs a fullname and a version".to_string(),
            });
        }
        self.router.publish_local(&root, overwrite).await
    }

    /// Run the project's uninstall steps
    pub async fn uninstall(&self) -> ErmineResult<()> {
        let root = Package::from_path(&self.project_dir)?;
        let steps = root
            .config()
            .map(|c| c.uninstall.clone())
            .unwrap_or_default();
        self.run_steps(&root, PHASE_UNINSTALL, &steps).await
    }

    /// Project directory this orchestrator drives
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }
}
