//! CLI argument definitions using clap
//!
//! Commands:
//! - aqp serve [--config <path>] [--port <n>] [--endpoint <url>] [--block-size <n>]
//! - aqp query --aggregate <AVG|SUM|COUNT> [--column <name>] [--steps <n>] [--demo]
//! - aqp check-config [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Progressive approximate aggregates over paginated datasets
#[derive(Parser, Debug)]
#[command(name = "aqp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Settings that override the configuration file
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Remote resource URL (switches the source to the remote API)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Read rows from a JSON-lines file instead of the remote API
    #[arg(long, conflicts_with = "endpoint")]
    pub jsonl: Option<PathBuf>,

    /// Rows per block
    #[arg(long)]
    pub block_size: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the start/refine HTTP API
    Serve {
        /// Path to configuration file (defaults apply if it does not exist)
        #[arg(long, default_value = "./aqp.json")]
        config: PathBuf,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Run one progressive query in the terminal, printing each estimate
    Query {
        /// Path to configuration file (defaults apply if it does not exist)
        #[arg(long, default_value = "./aqp.json")]
        config: PathBuf,

        /// SUM, AVG or COUNT
        #[arg(long)]
        aggregate: String,

        /// Column to aggregate (not needed for COUNT)
        #[arg(long)]
        column: Option<String>,

        /// Maximum number of refinements after the first block
        #[arg(long, default_value_t = 10)]
        steps: u32,

        /// Use a small built-in table instead of any configured source
        #[arg(long)]
        demo: bool,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Load and validate the configuration, then print it
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./aqp.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
