//! Dependency resolver
//!
//! Breadth-first walk over the dependency graph from a configured root.
//! Each declared dep is materialized through the cache router, deduplicated
//! by fullname, and the final graph is ordered so every package comes
//! after everything it depends on, with the root last.

use crate::cache::CacheRouter;
use crate::error::{ErmineError, ErmineResult};
use crate::package::Package;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, warn};

/// A fully resolved dependency graph
#[derive(Debug)]
pub struct Resolution {
    /// Packages in build order: dependencies first, root last
    pub ordered: Vec<Package>,
    /// Dependency edges, requester identity to dep identities
    pub edges: HashMap<String, Vec<String>>,
}

impl Resolution {
    /// Identity of the root package (always the last ordered entry)
    pub fn root_identity(&self) -> &str {
        self.ordered
            .last()
            .map(|p| identity_of(p))
            .unwrap_or_default()
    }

    /// Group packages by dependency depth: level 0 has no deps, each
    /// later level depends only on earlier ones. Levels drive parallel
    /// scheduling; everything within one level is independent.
    pub fn levels(&self) -> Vec<Vec<&Package>> {
        let mut depth: HashMap<&str, usize> = HashMap::new();
        // ordered is already topological, so deps are assigned first
        for package in &self.ordered {
            let id = identity_of(package);
            let level = self
                .edges
                .get(id)
                .map(|deps| {
                    deps.iter()
                        .filter_map(|d| depth.get(d.as_str()))
                        .max()
                        .map(|m| m + 1)
                        .unwrap_or(0)
                })
                .unwrap_or(0);
            depth.insert(id, level);
        }

        let max_level = depth.values().copied().max().unwrap_or(0);
        let mut levels: Vec<Vec<&Package>> = vec![Vec::new(); max_level + 1];
        for package in &self.ordered {
            levels[depth[identity_of(package)]].push(package);
        }
        levels
    }
}

fn identity_of(package: &Package) -> &str {
    package.fullname.as_deref().unwrap_or(&package.name)
}

/// Walks and materializes the dependency graph through the cache router
pub struct Resolver<'a> {
    router: &'a CacheRouter,
}

impl<'a> Resolver<'a> {
    pub fn new(router: &'a CacheRouter) -> Self {
        Self { router }
    }

    /// Resolve the transitive dependency graph of a configured root
    pub async fn resolve(&self, root: Package) -> ErmineResult<Resolution> {
        let root_config = root.config().cloned().ok_or_else(|| {
            ErmineError::Internal(format!("resolving {} before configuration", root.name))
        })?;
        let root_id = identity_of(&root).to_string();

        let mut resolved: HashMap<String, Package> = HashMap::new();
        let mut discovery: Vec<String> = vec![root_id.clone()];
        let mut edges: HashMap<String, Vec<String>> = HashMap::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        resolved.insert(root_id.clone(), root);
        queue.push_back(root_id.clone());

        while let Some(requester_id) = queue.pop_front() {
            let requester_config = resolved[&requester_id]
                .config()
                .cloned()
                .expect("queued packages are configured");

            for dep in &requester_config.deps {
                let candidate = Package::from_dep(dep);
                let dep_id = identity_of(&candidate).to_string();

                if dep_id == requester_id {
                    return Err(ErmineError::CyclicDependency(format!(
                        "{} -> {}",
                        requester_id, dep_id
                    )));
                }

                if let Some(existing) = resolved.get(&dep_id) {
                    let wanted = candidate.version_ref.as_deref().unwrap_or_default();
                    let held = existing.version_ref.as_deref().unwrap_or_default();
                    if wanted != held {
                        if requester_config.compare_versions {
                            return Err(ErmineError::VersionConflict {
                                fullname: dep_id,
                                wanted: wanted.to_string(),
                                resolved: held.to_string(),
                            });
                        }
                        warn!(
                            "{} wants {}:{}, keeping already-resolved {}",
                            requester_id, dep_id, wanted, held
                        );
                    }
                    edges.entry(requester_id.clone()).or_default().push(dep_id);
                    continue;
                }

                let package = match self.router.resolve(candidate).await {
                    Ok(p) => p,
                    Err(ErmineError::DependencyNotFound(name))
                        if requester_config.drop_unknown_deps =>
                    {
                        warn!("dropping unknown dep {} of {}", name, requester_id);
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                debug!("{} pulled in {}", requester_id, dep_id);
                edges
                    .entry(requester_id.clone())
                    .or_default()
                    .push(dep_id.clone());
                discovery.push(dep_id.clone());
                resolved.insert(dep_id.clone(), package);
                queue.push_back(dep_id);
            }
        }

        info!(
            "resolved {} packages for {}",
            resolved.len().saturating_sub(1),
            root_id
        );

        let ordered_ids = if root_config.auto_build_order {
            topo_order(&discovery, &edges, &root_id)?
        } else {
            // Validate acyclicity but keep discovery order, root last
            topo_order(&discovery, &edges, &root_id)?;
            let mut ids: Vec<String> =
                discovery.iter().filter(|id| **id != root_id).cloned().collect();
            ids.push(root_id);
            ids
        };

        let ordered = ordered_ids
            .into_iter()
            .map(|id| resolved.remove(&id).expect("ordered ids come from resolved"))
            .collect();

        Ok(Resolution { ordered, edges })
    }
}

/// Kahn's sort over the dependency edges: a package is ready once all of
/// its deps are emitted. Ties break on discovery order, so sibling order
/// is stable across runs. The root always lands last because everything
/// reachable is (transitively) one of its deps.
fn topo_order(
    discovery: &[String],
    edges: &HashMap<String, Vec<String>>,
    root_id: &str,
) -> ErmineResult<Vec<String>> {
    let mut emitted: HashSet<&str> = HashSet::new();
    let mut ordered: Vec<String> = Vec::with_capacity(discovery.len());

    while ordered.len() < discovery.len() {
        let mut progressed = false;
        for id in discovery {
            if emitted.contains(id.as_str()) {
                continue;
            }
            let ready = edges
                .get(id)
                .map(|deps| deps.iter().all(|d| emitted.contains(d.as_str())))
                .unwrap_or(true);
            if ready && (id != root_id || ordered.len() == discovery.len() - 1) {
                emitted.insert(id);
                ordered.push(id.clone());
                progressed = true;
            }
        }
        if !progressed {
            let stuck: Vec<&str> = discovery
                .iter()
                .filter(|id| !emitted.contains(id.as_str()))
                .map(String::as_str)
                .collect();
            return Err(ErmineError::CyclicDependency(stuck.join(" -> ")));
        }
    }
    Ok(ordered)
}
