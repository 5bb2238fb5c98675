//! CLI argument definitions using clap
//!
//! Commands:
//! - modelguard check --config <path>
//! - modelguard validate --config <path> --schema <name> [--strict]

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// modelguard - validate JSON documents against declarative schemas
#[derive(Parser, Debug)]
#[command(name = "modelguard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load every schema in the schema directory and report them
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./modelguard.json")]
        config: PathBuf,
    },

    /// Validate newline-delimited JSON documents from stdin
    Validate {
        /// Path to configuration file
        #[arg(long, default_value = "./modelguard.json")]
        config: PathBuf,

        /// Name of the schema to validate against
        #[arg(long)]
        schema: String,

        /// Disable lax coercion regardless of config
        #[arg(long)]
        strict: bool,
    },
}

impl Command {
    /// Configuration file named by the command
    pub fn config_path(&self) -> &Path {
        match self {
            Command::Check { config } | Command::Validate { config, .. } => config,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
