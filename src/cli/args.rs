//! CLI argument definitions using clap
//!
//! Commands:
//! - cohortq init --config <path>
//! - cohortq start --config <path>
//! - cohortq query --config <path> --request <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cohortq - a streaming filter-query engine for partitioned
/// patient-survey data
#[derive(Parser, Debug)]
#[command(name = "cohortq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a starter configuration file
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./cohortq.json")]
        config: PathBuf,
    },

    /// Start the query server
    Start {
        /// Path to configuration file
        #[arg(long, default_value = "./cohortq.json")]
        config: PathBuf,
    },

    /// Execute a single filter request and exit
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./cohortq.json")]
        config: PathBuf,

        /// Path to the JSON request file
        #[arg(long)]
        request: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
