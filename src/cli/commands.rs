//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use super::args::{Command, Overrides};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::write_json;
use crate::engine::{QueryEngine, SessionRegistry};
use crate::http_server::HttpServer;
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::source::{BlockSource, MemorySource};

/// Rows in the `--demo` table
const DEMO_ROWS: usize = 5_000;

/// Parse arguments and dispatch
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve {
            config,
            port,
            overrides,
        } => serve(&config, port, &overrides),
        Command::Query {
            config,
            aggregate,
            column,
            steps,
            demo,
            overrides,
        } => query(&config, &overrides, &aggregate, column.as_deref(), steps, demo),
        Command::CheckConfig { config } => check_config(&config),
    }
}

fn load_config(path: &Path, overrides: &Overrides) -> CliResult<Config> {
    let config = Config::load_or_default(path)?.apply(overrides)?;
    let block_size = config.engine.block_size.to_string();
    let path = path.display().to_string();
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("block_size", block_size.as_str()), ("path", path.as_str())],
    );
    Ok(config)
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::serve_failed(format!("Failed to create tokio runtime: {}", e)))
}

/// Serve the HTTP API
pub fn serve(config_path: &Path, port: Option<u16>, overrides: &Overrides) -> CliResult<()> {
    let mut config = load_config(config_path, overrides)?;
    if let Some(port) = port {
        config.http.port = port;
    }

    let source = config.build_source()?;
    let engine = QueryEngine::new(source, config.engine.block_size);
    let registry = Arc::new(SessionRegistry::new(engine, config.sessions.clone()));
    let server = HttpServer::new(config.http.clone(), registry);

    runtime()?.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::serve_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Run one query to exhaustion or `steps` refinements, printing every estimate
pub fn query(
    config_path: &Path,
    overrides: &Overrides,
    aggregate: &str,
    column: Option<&str>,
    steps: u32,
    demo: bool,
) -> CliResult<()> {
    // stdout carries the estimates
    Logger::set_stderr_only(true);
    let config = load_config(config_path, overrides)?;
    let source: Arc<dyn BlockSource> = if demo {
        Arc::new(demo_source())
    } else {
        config.build_source()?
    };
    let engine = QueryEngine::new(source, config.engine.block_size);

    runtime()?.block_on(async {
        let mut query = engine.start(aggregate, column).await?;
        write_json(query.estimate())?;

        for _ in 0..steps {
            if query.is_exhausted() {
                break;
            }
            let estimate = engine.refine(&mut query).await?;
            write_json(&estimate)?;
        }
        Ok::<(), CliError>(())
    })
}

/// Validate the configuration and print the effective settings
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    write_json(&config)
}

/// Deterministic fare-like values in roughly [2.5, 50.5)
fn demo_source() -> MemorySource {
    let fares = (0..DEMO_ROWS)
        .map(|i| 2.5 + ((i * 7919) % 97) as f64 * 0.5)
        .collect();
    let tips = (0..DEMO_ROWS)
        .map(|i| ((i * 104_729) % 41) as f64 * 0.25)
        .collect();
    MemorySource::new()
        .with_column("fare_amount", fares)
        .with_column("tip_amount", tips)
}
