//! Pipe command - write stdin lines to a log stream
//!
//! Each input line that parses as JSON is logged as that value; anything
//! else is logged as a string. Empty lines are skipped.
//!
//! # Usage
//!
//! ```bash
//! tail -f app.out | spool pipe app
//! echo '{"event":"deploy"}' | spool pipe audit --file-only
//! ```

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use spool_config::Config;
use spool_sinks::{LogRecord, LogSink, SinkSettings};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Args, Debug)]
pub struct PipeArgs {
    /// Stream name (settings come from its [[streams]] entry if present)
    #[arg(value_name = "STREAM")]
    stream: String,

    /// Write to the log file only
    #[arg(long, conflicts_with = "terminal_only")]
    file_only: bool,

    /// Write to the terminal only
    #[arg(long)]
    terminal_only: bool,
}

pub async fn run(config: &Config, args: PipeArgs) -> Result<()> {
    let mut options = super::stream_options(config, &args.stream);
    if args.file_only {
        options.to_terminal = false;
    }
    if args.terminal_only {
        options.to_file = false;
    }

    let sink = LogSink::new(SinkSettings::from_global(&config.global), options)
        .with_context(|| format!("failed to start stream '{}'", args.stream))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut count = 0u64;
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        sink.log(parse_line(line));
        count += 1;
    }

    tracing::debug!(stream = %args.stream, lines = count, "stdin closed, flushing");
    sink.shutdown().await;
    Ok(())
}

/// JSON value if the line is JSON, the raw text otherwise
fn parse_line(line: String) -> LogRecord {
    match serde_json::from_str::<Value>(&line) {
        Ok(value) => value.into(),
        Err(_) => line.into(),
    }
}
