//! CLI module
//!
//! Provides command-line interface for:
//! - serve: run the HTTP API
//! - query: one progressive query printed to stdout
//! - check-config: validate a configuration file

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command, Overrides};
pub use commands::{check_config, query, run, run_command, serve};
pub use config::{Config, EngineSettings, SourceKind, SourceSettings, DEFAULT_BLOCK_SIZE, DEFAULT_ENDPOINT};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::write_json;
