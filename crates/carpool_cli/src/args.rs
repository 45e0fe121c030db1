//! CLI argument definitions using clap.
//!
//! Commands:
//! - carpool --config <path> stats
//! - carpool --config <path> tables

use carpool_core::BackendKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Storage inspector for carpool data directories and databases.
#[derive(Parser, Debug)]
#[command(name = "carpool")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured backend (csv|xml|document|sqlite)
    #[arg(long, global = true)]
    pub backend: Option<BackendKind>,

    /// Override the data directory (file backends) or database file
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,

    /// Write rolling logs to this absolute directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print the number of stored records per collection
    Stats,
    /// List tables (database backends) or collection files (file backends)
    Tables,
}
