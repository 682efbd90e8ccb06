//! Completions command - generate shell completion scripts

use crate::cli::args::{Cli, CompletionsArgs};
use crate::error::ErmineResult;
use clap::CommandFactory;

/// Execute the completions command
pub fn execute(args: CompletionsArgs) -> ErmineResult<()> {
    let mut command = Cli::command();
    clap_complete::generate(args.shell, &mut command, "ermine", &mut std::io::stdout());
    Ok(())
}
