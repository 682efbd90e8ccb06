//! Ermine - Erlang Package Manager and Build Orchestrator
//!
//! Resolves transitive dependency graphs, fetches packages through a
//! tiered cache (local disk, registry, artifactory, raw git), builds in
//! dependency order, and packages outputs as `.ep` archives.

pub mod actions;
pub mod archive;
pub mod build;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod package;
pub mod resolver;

pub use error::{ErmineError, ErmineResult};
