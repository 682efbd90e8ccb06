//! Deps command - resolve and materialize the dependency graph

use crate::build::Orchestrator;
use crate::config::Config;
use crate::error::ErmineResult;
use console::style;
use std::path::Path;

/// Execute the deps command
pub async fn execute(config: &Config, project_dir: &Path) -> ErmineResult<()> {
    let orchestrator = Orchestrator::new(config, project_dir.to_path_buf()).await;
    let resolution = orchestrator.populate().await?;

    // Last entry is the project itself
    let deps = &resolution.ordered[..resolution.ordered.len().saturating_sub(1)];
    if deps.is_empty() {
        println!("{} no dependencies", style("✓").green().bold());
        return Ok(());
    }

    println!(
        "{} resolved {} dependencies (build order):",
        style("✓").green().bold(),
        deps.len()
    );
    for package in deps {
        let identity = package.fullname.as_deref().unwrap_or(&package.name);
        let version = package.version_ref.as_deref().unwrap_or("?");
        println!("  {} {}", identity, style(version).dim());
    }
    Ok(())
}
