//! Publish command - store the project in the local cache

use crate::build::Orchestrator;
use crate::cli::args::PublishArgs;
use crate::config::Config;
use crate::error::ErmineResult;
use console::style;
use std::path::Path;

/// Execute the publish command
pub async fn execute(args: PublishArgs, config: &Config, project_dir: &Path) -> ErmineResult<()> {
    let orchestrator = Orchestrator::new(config, project_dir.to_path_buf()).await;

    if orchestrator.publish(args.overwrite).await? {
        println!("{} published to local cache", style("✓").green().bold());
    } else {
        println!(
            "{} already published (use --overwrite to replace)",
            style("!").yellow().bold()
        );
    }
    Ok(())
}
