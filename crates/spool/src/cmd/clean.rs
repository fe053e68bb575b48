//! Clean command - run one retention pass
//!
//! Deletes log files older than the configured maximum age and prints a
//! summary. Ignores `retention.enabled` and the schedule.

use anyhow::{Context, Result};
use clap::Args;
use spool_config::Config;
use spool_retention::RetentionEngine;

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Quiet mode - don't print the summary
    #[arg(short, long)]
    quiet: bool,
}

pub async fn run(config: &Config, args: CleanArgs) -> Result<()> {
    let engine = RetentionEngine::from_config(config).context("invalid retention settings")?;
    let report = engine
        .run_once()
        .await
        .with_context(|| format!("retention pass over {} failed", engine.base_dir().display()))?;

    if !args.quiet {
        println!("Directory: {}", engine.base_dir().display());
        println!("  scanned: {}", report.scanned);
        println!("  matched: {}", report.matched);
        println!("  expired: {}", report.expired);
        println!("  deleted: {}", report.deleted);
        println!("  failed:  {}", report.failed);
    }

    if report.failed > 0 {
        anyhow::bail!("{} file(s) could not be deleted", report.failed);
    }
    Ok(())
}
