//! CLI module for cohortq
//!
//! Provides the command-line interface:
//! - init: write a starter configuration file
//! - start: boot the query server
//! - query: one-shot filter execution against the data file

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{init, query, run_command, start, Config};
pub use errors::{CliError, CliErrorCode, CliResult};

/// Parse arguments and dispatch the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}
