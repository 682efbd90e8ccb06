//! Build command - build the project and its dependencies

use crate::build::Orchestrator;
use crate::config::Config;
use crate::error::ErmineResult;
use console::style;
use std::path::Path;

/// Execute the build command
pub async fn execute(config: &Config, project_dir: &Path) -> ErmineResult<()> {
    let orchestrator = Orchestrator::new(config, project_dir.to_path_buf()).await;
    orchestrator.build().await?;

    println!("{} build complete", style("✓").green().bold());
    Ok(())
}
