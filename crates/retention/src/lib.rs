//! Spool - Retention
//!
//! Deletes aged log files on a cron schedule.
//!
//! # Architecture
//!
//! ```text
//! [RetentionScheduler] --cron tick--> [RetentionEngine::run_once]
//!                                        │ list base_dir
//!                                        │ parse <stream>_<date>(_NNN).log
//!                                        │ age > policy(stream)?
//!                                        └─> delete in concurrent batches
//! ```
//!
//! The engine shares nothing with the log sinks besides the directory and
//! the file naming convention.
//!
//! # Example
//!
//! ```no_run
//! use spool_retention::{RetentionEngine, RetentionPolicy};
//!
//! # async fn run() -> spool_retention::Result<()> {
//! let engine = RetentionEngine::new(".logs", RetentionPolicy::uniform(30));
//! let report = engine.run_once().await?;
//! println!("deleted {} files", report.deleted);
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod policy;
mod scheduler;

pub use engine::{CandidateFile, RetentionEngine, RetentionReport, age_in_days};
pub use error::{Result, RetentionError};
pub use policy::RetentionPolicy;
pub use scheduler::{RetentionScheduler, SchedulerHandle, is_scheduler_active};
