//! Bench command - measure sink throughput
//!
//! Writes synthetic records through a benchmark-mode stream (no logTime,
//! hostname or pid; terminal output discarded) and reports the rate.
//!
//! # Usage
//!
//! ```bash
//! spool bench
//! spool bench --lines 1000000 --payload 512 --terminal
//! ```

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use spool_config::Config;
use spool_sinks::{LogSink, SinkSettings, StreamOptions};

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Stream name for the benchmark files
    #[arg(short, long, default_value = "bench")]
    stream: String,

    /// Number of records to write
    #[arg(short = 'n', long, default_value = "100000")]
    lines: u64,

    /// Payload bytes per record
    #[arg(short, long, default_value = "100")]
    payload: usize,

    /// Also run the (discarded) terminal channel
    #[arg(short, long)]
    terminal: bool,
}

pub async fn run(config: &Config, args: BenchArgs) -> Result<()> {
    let options = StreamOptions::new(&args.stream)
        .with_benchmark(true)
        .with_terminal(args.terminal);
    let settings = SinkSettings::from_global(&config.global);
    let base_dir = settings.base_dir.clone();

    let sink = LogSink::new(settings, options)
        .with_context(|| format!("failed to start stream '{}'", args.stream))?;

    println!(
        "Writing {} records ({} byte payload) to {}...",
        args.lines,
        args.payload,
        base_dir.display()
    );

    let payload = "x".repeat(args.payload);
    let start = Instant::now();
    for i in 0..args.lines {
        sink.log(json!({"seq": i, "payload": payload}));
    }
    let enqueued = start.elapsed();

    sink.flush_all().await;
    let elapsed = start.elapsed();
    let metrics = sink.metrics();
    sink.shutdown().await;

    let secs = elapsed.as_secs_f64().max(f64::EPSILON);
    let bytes = metrics.file.map(|m| m.bytes_written).unwrap_or_default();
    println!("  enqueued in: {:.3}s", enqueued.as_secs_f64());
    println!("  flushed in:  {:.3}s", secs);
    println!("  records/s:   {:.0}", args.lines as f64 / secs);
    println!("  MB/s:        {:.1}", bytes as f64 / secs / (1024.0 * 1024.0));
    if let Some(file) = metrics.file {
        println!("  writes:      {}", file.writes);
        println!("  rotations:   {}", file.rotations);
    }

    Ok(())
}
