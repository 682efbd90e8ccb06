//! Fetch command - materialize a single package from the cache tiers

use crate::build::Orchestrator;
use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::ErmineResult;
use crate::package::Package;
use console::style;
use std::path::Path;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config, project_dir: &Path) -> ErmineResult<()> {
    let orchestrator = Orchestrator::new(config, project_dir.to_path_buf()).await;

    let package = Package::from_cache_entry(&args.fullname, &args.version);
    let fetched = orchestrator.router().resolve(package).await?;

    println!(
        "{} fetched {}:{} into {}",
        style("✓").green().bold(),
        args.fullname,
        args.version,
        fetched
            .local_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    );
    Ok(())
}
