//! Retention scheduler with cron support
//!
//! Runs a [`RetentionEngine`] pass at every time the cron schedule fires.
//! Only one scheduler may be active per process; starting a second one
//! logs a warning and does nothing.
//!
//! Passes run in their own task. If a pass is still running when the next
//! one is due, that tick is skipped.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use spool_config::{Config, normalize_cron};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::RetentionEngine;
use crate::error::{Result, RetentionError};

/// Set while a scheduler task is alive
static SCHEDULER_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Whether a retention scheduler is running in this process
pub fn is_scheduler_active() -> bool {
    SCHEDULER_ACTIVE.load(Ordering::SeqCst)
}

/// Releases the process-wide latch when the scheduler task ends
struct ActiveGuard;

impl ActiveGuard {
    fn acquire() -> Option<Self> {
        SCHEDULER_ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
            .then_some(Self)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        SCHEDULER_ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// Retention engine bound to a cron schedule
pub struct RetentionScheduler {
    engine: Arc<RetentionEngine>,
    schedule: Schedule,
    expression: String,
}

impl RetentionScheduler {
    /// Create a scheduler
    ///
    /// Five-field expressions (minute first) are accepted and fire at
    /// second 0.
    pub fn new(engine: RetentionEngine, expression: &str) -> Result<Self> {
        let normalized = normalize_cron(expression);
        let schedule = Schedule::from_str(&normalized)
            .map_err(|e| RetentionError::InvalidSchedule(format!("{}: {}", expression, e)))?;

        Ok(Self {
            engine: Arc::new(engine),
            schedule,
            expression: normalized,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let engine = RetentionEngine::from_config(config)?;
        Self::new(engine, &config.retention.schedule)
    }

    /// Cron expression in seconds-first form
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Next time the schedule fires
    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.schedule.upcoming(Utc).next()
    }

    /// Run one pass right away
    pub async fn run_now(&self) -> Result<crate::RetentionReport> {
        self.engine.run_once().await
    }

    /// Start the scheduler loop
    ///
    /// Returns `None` if another scheduler is already active.
    pub fn start(self) -> Option<SchedulerHandle> {
        let Some(guard) = ActiveGuard::acquire() else {
            warn!(
                schedule = %self.expression,
                "retention scheduler already running, not starting another"
            );
            return None;
        };

        info!(
            schedule = %self.expression,
            dir = %self.engine.base_dir().display(),
            next_run = ?self.next_run(),
            "starting retention scheduler"
        );

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(stop_rx, guard));
        Some(SchedulerHandle {
            stop: Some(stop_tx),
            task,
        })
    }

    async fn run(self, mut stop: oneshot::Receiver<()>, _guard: ActiveGuard) {
        let running = Arc::new(AtomicBool::new(false));

        loop {
            let Some(next) = self.schedule.upcoming(Utc).next() else {
                warn!(schedule = %self.expression, "retention schedule has no upcoming runs");
                break;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = &mut stop => break,
                _ = tokio::time::sleep(wait) => {}
            }

            // Skip if already running (prevents overlap)
            if running
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
                .is_err()
            {
                warn!("skipping scheduled run - previous execution still in progress");
                continue;
            }

            let engine = Arc::clone(&self.engine);
            let running_flag = Arc::clone(&running);
            tokio::spawn(async move {
                match engine.run_once().await {
                    Ok(report) => debug!(
                        deleted = report.deleted,
                        failed = report.failed,
                        "scheduled retention pass finished"
                    ),
                    Err(e) => error!(error = %e, "scheduled retention pass failed"),
                }
                // Mark as done so next scheduled run can proceed
                running_flag.store(false, Ordering::SeqCst);
            });
        }

        info!("retention scheduler stopped");
    }
}

/// Handle to a running scheduler
///
/// Dropping the handle also stops the scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the scheduler and wait for its loop to exit
    ///
    /// A pass that is already running finishes in the background.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            error!(error = %e, "retention scheduler task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use spool_sinks::active_file_name;
    use tempfile::TempDir;

    use super::*;
    use crate::RetentionPolicy;

    #[test]
    fn test_invalid_schedule() {
        let engine = RetentionEngine::new("unused", RetentionPolicy::uniform(30));
        let result = RetentionScheduler::new(engine, "not a schedule");
        assert!(matches!(result, Err(RetentionError::InvalidSchedule(_))));
    }

    #[test]
    fn test_five_field_expression() {
        let engine = RetentionEngine::new("unused", RetentionPolicy::uniform(30));
        let scheduler = RetentionScheduler::new(engine, "5 0 * * *").unwrap();
        assert_eq!(scheduler.expression(), "0 5 0 * * *");

        let next = scheduler.next_run().unwrap();
        assert!(next > Utc::now());
        assert_eq!(next.format("%H:%M:%S").to_string(), "00:05:00");
    }

    // The latch is process-wide, so the whole lifecycle lives in one test.
    #[tokio::test]
    async fn test_scheduler_lifecycle() {
        let tmp = TempDir::new().unwrap();
        let old = chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let old_file = tmp.path().join(active_file_name("app", old));
        fs::write(&old_file, b"{}\n").unwrap();

        let every_second = || {
            let engine = RetentionEngine::new(tmp.path(), RetentionPolicy::uniform(30));
            RetentionScheduler::new(engine, "* * * * * *").unwrap()
        };

        let handle = every_second().start().expect("first scheduler starts");
        assert!(is_scheduler_active());
        assert!(every_second().start().is_none());

        // one tick is at most a second away
        for _ in 0..40 {
            if !old_file.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(!old_file.exists());

        handle.stop().await;
        assert!(!is_scheduler_active());

        let again = every_second().start().expect("latch released after stop");
        again.stop().await;
        assert!(!is_scheduler_active());
    }
}
