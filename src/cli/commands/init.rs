//! Init command - create a project-local ermine.json

use crate::cli::args::InitArgs;
use crate::error::{ErmineError, ErmineResult};
use console::style;
use std::path::Path;
use tokio::fs;

/// Skeleton project config
const INIT_TEMPLATE: &str = r#"{
    "name": "{name}",
    "app_vsn": "0.1.0",
    "deps": []
}
"#;

/// Execute the init command
pub async fn execute(args: InitArgs, project_dir: &Path) -> ErmineResult<()> {
    let target = project_dir.join("ermine.json");

    if target.exists() && !args.force {
        println!(
            "{} {} already exists (use --force to overwrite)",
            style("!").yellow().bold(),
            target.display()
        );
        return Ok(());
    }

    let name = project_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "myapp".to_string());

    let content = INIT_TEMPLATE.replace("{name}", &name);
    fs::write(&target, content)
        .await
        .map_err(|e| ErmineError::io(format!("writing {}", target.display()), e))?;

    println!(
        "{} initialized {}",
        style("✓").green().bold(),
        target.display()
    );
    Ok(())
}
