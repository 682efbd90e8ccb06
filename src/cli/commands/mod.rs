//! CLI command implementations

pub mod build;
pub mod completions;
pub mod config;
pub mod deps;
pub mod fetch;
pub mod init;
pub mod package;
pub mod publish;

pub use build::execute as build;
pub use completions::execute as completions;
pub use config::execute as config;
pub use deps::execute as deps;
pub use fetch::execute as fetch;
pub use init::execute as init;
pub use package::execute as package;
pub use publish::execute as publish;
