//! Spool - buffered log sinks with rotation and retention
//!
//! # Usage
//!
//! ```bash
//! # Pipe stdin lines into the "api" stream
//! some-app | spool pipe api
//!
//! # Delete aged log files once
//! spool clean --config spool.toml
//!
//! # Run the retention schedule until Ctrl-C
//! spool retention
//!
//! # Measure sink throughput
//! spool bench --lines 1000000
//! ```

mod cmd;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spool_config::{Config, DiagnosticFormat};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "spool.toml";

/// Spool - buffered log sinks with rotation and retention
#[derive(Parser, Debug)]
#[command(name = "spool")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write stdin lines to a log stream
    Pipe(cmd::pipe::PipeArgs),

    /// Run one retention pass
    Clean(cmd::clean::CleanArgs),

    /// Run the retention schedule until interrupted
    Retention,

    /// Measure sink throughput
    Bench(cmd::bench::BenchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let log_level = cli
        .log_level
        .unwrap_or_else(|| config.log.level.as_str().to_string());
    init_logging(&log_level, config.log.format)?;

    match cli.command {
        Command::Pipe(args) => cmd::pipe::run(&config, args).await,
        Command::Clean(args) => cmd::clean::run(&config, args).await,
        Command::Retention => cmd::retention::run(&config).await,
        Command::Bench(args) => cmd::bench::run(&config, args).await,
    }
}

/// Load config: explicit path > ./spool.toml > defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        return Config::from_file(default_path)
            .with_context(|| format!("failed to load config from {}", DEFAULT_CONFIG_FILE));
    }

    Ok(Config::default())
}

/// Initialize the tracing subscriber for diagnostics
///
/// Diagnostics go to stderr; stdout belongs to the terminal channels.
fn init_logging(level: &str, format: DiagnosticFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let json = format == DiagnosticFormat::Json;
    tracing_subscriber::registry()
        .with(
            (!json).then(|| {
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
            }),
        )
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with(filter)
        .init();

    Ok(())
}
