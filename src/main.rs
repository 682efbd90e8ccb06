//! Ermine - Erlang package manager
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use ermine::cli::{Cli, Commands};
use ermine::config::ConfigManager;
use ermine::error::{ErmineError, ErmineResult};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ErmineResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("ermine=warn"),
        1 => EnvFilter::new("ermine=info"),
        _ => EnvFilter::new("ermine=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let project_dir = match cli.project {
        Some(dir) => dir,
        None => current_dir()?,
    };

    // Commands that need no configuration
    match cli.command {
        Commands::Init(args) => return ermine::cli::commands::init(args, &project_dir).await,
        Commands::Completions(args) => return ermine::cli::commands::completions(args),
        _ => {}
    }

    let manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = manager.load().await?;
    ConfigManager::ensure_cache_dirs(&config).await?;

    match cli.command {
        Commands::Init(_) | Commands::Completions(_) => unreachable!("handled above"),
        Commands::Deps => ermine::cli::commands::deps(&config, &project_dir).await,
        Commands::Fetch(args) => ermine::cli::commands::fetch(args, &config, &project_dir).await,
        Commands::Build => ermine::cli::commands::build(&config, &project_dir).await,
        Commands::Package => ermine::cli::commands::package(&config, &project_dir).await,
        Commands::Publish(args) => {
            ermine::cli::commands::publish(args, &config, &project_dir).await
        }
        Commands::Config(args) => ermine::cli::commands::config(args, &config, &manager).await,
    }
}

fn current_dir() -> ErmineResult<PathBuf> {
    std::env::current_dir().map_err(|e| ErmineError::io("getting current directory", e))
}
