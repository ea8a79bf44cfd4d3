//! CLI argument definitions using clap
//!
//! Commands:
//! - fieldbind bind --specs <dir> --class <name> [--config <path>]
//! - fieldbind check --specs <dir> [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fieldbind - Declarative field binding and validation
#[derive(Parser, Debug)]
#[command(name = "fieldbind")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Minimum severity written to stderr (trace, info, warn, error, fatal)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bind one JSON object from stdin against a declared class
    Bind {
        /// Directory of class declaration files
        #[arg(long)]
        specs: PathBuf,

        /// Class to bind against
        #[arg(long)]
        class: String,

        /// Path to binding configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Load and resolve every declared class
    Check {
        /// Directory of class declaration files
        #[arg(long)]
        specs: PathBuf,

        /// Path to binding configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
