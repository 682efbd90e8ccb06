//! Package command - archive the project into a .ep file

use crate::build::Orchestrator;
use crate::config::Config;
use crate::error::ErmineResult;
use console::style;
use std::path::Path;

/// Execute the package command
pub async fn execute(config: &Config, project_dir: &Path) -> ErmineResult<()> {
    let orchestrator = Orchestrator::new(config, project_dir.to_path_buf()).await;
    let archive_path = orchestrator.package()?;

    println!(
        "{} packaged {}",
        style("✓").green().bold(),
        archive_path.display()
    );
    Ok(())
}
