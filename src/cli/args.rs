//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Ermine - Erlang package manager
///
/// Resolves dependency graphs through a tiered package cache and drives
/// builds bottom-up.
#[derive(Parser, Debug)]
#[command(name = "ermine")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "ERMINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a project-local ermine.json
    Init(InitArgs),

    /// Resolve and materialize the dependency graph
    Deps,

    /// Fetch a single package into the workspace
    Fetch(FetchArgs),

    /// Build the project and its dependencies
    Build,

    /// Archive the project into a .ep package
    Package,

    /// Publish the project into the local cache
    Publish(PublishArgs),

    /// Show or inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite an existing ermine.json
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Package identifier (owner/name)
    pub fullname: String,

    /// Version to fetch
    #[arg(id = "pkg_version", value_name = "VERSION")]
    pub version: String,
}

/// Arguments for the publish command
#[derive(Parser, Debug)]
pub struct PublishArgs {
    /// Replace an already-published version
    #[arg(long)]
    pub overwrite: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fetch_takes_fullname_and_version_positionals() {
        let cli = Cli::parse_from(["ermine", "fetch", "ninenines/cowboy", "2.9.0"]);
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.fullname, "ninenines/cowboy");
                assert_eq!(args.version, "2.9.0");
            }
            other => panic!("parsed {:?} instead of fetch", other),
        }
    }

    #[test]
    fn verbosity_accumulates() {
        let cli = Cli::parse_from(["ermine", "-vv", "build"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Build));
    }
}
