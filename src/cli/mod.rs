//! CLI module for modelguard
//!
//! Provides command-line interface for:
//! - check: Load and list every schema in the configured directory
//! - validate: Validate stdin documents against one schema

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    check, init_logging, run_command, validate, validate_stream, Config, ValidateSummary,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_documents, write_error, write_invalid, write_response, InputLine};

/// Parse arguments, load configuration, and run the requested command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let config = Config::load(cli.command.config_path())?;
    init_logging(&config);
    run_command(&cli.command, &config)
}
