//! Retention command - run the cleanup schedule until Ctrl-C

use anyhow::{Context, Result};
use spool_config::Config;
use spool_retention::RetentionScheduler;

pub async fn run(config: &Config) -> Result<()> {
    if !config.retention.enabled {
        tracing::warn!("retention is disabled in the config, nothing to do");
        return Ok(());
    }

    let scheduler = RetentionScheduler::from_config(config).context("invalid retention settings")?;
    let Some(handle) = scheduler.start() else {
        anyhow::bail!("a retention scheduler is already running");
    };

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("shutting down retention scheduler");
    handle.stop().await;
    Ok(())
}
