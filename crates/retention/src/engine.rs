//! Retention engine
//!
//! One pass lists the log directory, matches entries against the file
//! naming convention and deletes files older than their stream's maximum
//! age. Deletions run concurrently in batches of `batch_size`.
//!
//! The age of a file is the number of whole days between the UTC date in
//! its name and today's UTC date. The rotation index never affects it:
//! `api_2024-02-01_003.log` is as old as `api_2024-02-01.log`.

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use futures_util::future::join_all;
use spool_config::{Config, DEFAULT_BATCH_SIZE};
use spool_sinks::naming::parse_file_name;
use spool_sinks::{SharedClock, SystemClock};

use crate::error::{Result, RetentionError};
use crate::policy::RetentionPolicy;

/// A log file found in the base directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Stream name, lower-cased
    pub stream: String,
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// Outcome of one retention pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    /// Directory entries looked at
    pub scanned: usize,
    /// Entries that follow the naming convention
    pub matched: usize,
    /// Files past their maximum age
    pub expired: usize,
    pub deleted: usize,
    pub failed: usize,
    /// Size of each deletion batch, in order
    pub batches: Vec<usize>,
}

/// Whole days between `date` and `today`
pub fn age_in_days(date: NaiveDate, today: NaiveDate) -> i64 {
    (today - date).num_days().abs()
}

/// Deletes aged log files from one directory
#[derive(Debug, Clone)]
pub struct RetentionEngine {
    base_dir: PathBuf,
    policy: RetentionPolicy,
    batch_size: usize,
    clock: SharedClock,
}

impl RetentionEngine {
    pub fn new(base_dir: impl Into<PathBuf>, policy: RetentionPolicy) -> Self {
        Self {
            base_dir: base_dir.into(),
            policy,
            batch_size: DEFAULT_BATCH_SIZE,
            clock: SystemClock::shared(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let engine = Self::new(
            config.global.base_dir_path(),
            RetentionPolicy::from_max_age(&config.retention.max_age),
        );
        engine.with_batch_size(config.retention.batch_size)
    }

    /// Files deleted concurrently, must be positive
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(RetentionError::InvalidSettings(
                "batch size must be positive".into(),
            ));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Run one retention pass
    ///
    /// A missing directory yields an empty report and a directory that
    /// cannot be listed is an error. Failed deletions are logged and
    /// counted; they never stop the rest of the pass. If listing fails
    /// part way through, files already found expired are still deleted.
    pub async fn run_once(&self) -> Result<RetentionReport> {
        let mut report = RetentionReport::default();

        if let Err(e) = tokio::fs::create_dir_all(&self.base_dir).await {
            tracing::debug!(dir = %self.base_dir.display(), error = %e, "could not create log directory");
        }
        let mut entries = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(self.list_error(e)),
        };

        let today = self.clock.today_utc();
        let mut batch: Vec<PathBuf> = Vec::with_capacity(self.batch_size);

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                // directory removed mid-pass
                Err(e) if e.kind() == io::ErrorKind::NotFound => break,
                Err(e) => {
                    tracing::error!(
                        dir = %self.base_dir.display(),
                        error = %e,
                        "listing log directory failed, deleting files found so far"
                    );
                    break;
                }
            };
            report.scanned += 1;

            let Some(candidate) = self.candidate(&entry.file_name(), entry.path()) else {
                continue;
            };
            if !entry.file_type().await.is_ok_and(|t| t.is_file()) {
                continue;
            }
            report.matched += 1;

            let Some(max_age) = self.policy.max_age_for(&candidate.stream) else {
                continue;
            };
            let age = age_in_days(candidate.date, today);
            if age <= i64::from(max_age) {
                continue;
            }

            tracing::debug!(path = %candidate.path.display(), age, max_age, "log file expired");
            report.expired += 1;
            batch.push(candidate.path);
            if batch.len() >= self.batch_size {
                delete_batch(&mut batch, &mut report).await;
            }
        }

        if !batch.is_empty() {
            delete_batch(&mut batch, &mut report).await;
        }

        tracing::info!(
            dir = %self.base_dir.display(),
            scanned = report.scanned,
            expired = report.expired,
            deleted = report.deleted,
            failed = report.failed,
            "retention pass complete"
        );
        Ok(report)
    }

    fn candidate(&self, name: &std::ffi::OsStr, path: PathBuf) -> Option<CandidateFile> {
        let parsed = parse_file_name(name.to_str()?)?;
        Some(CandidateFile {
            stream: parsed.stream.to_lowercase(),
            date: parsed.date,
            path,
        })
    }

    fn list_error(&self, source: io::Error) -> RetentionError {
        RetentionError::List {
            path: self.base_dir.display().to_string(),
            source,
        }
    }
}

/// Delete every path in `batch` concurrently and clear it
async fn delete_batch(batch: &mut Vec<PathBuf>, report: &mut RetentionReport) {
    let results = join_all(batch.iter().map(tokio::fs::remove_file)).await;

    for (path, result) in batch.iter().zip(results) {
        match result {
            Ok(()) => report.deleted += 1,
            // already gone
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to delete log file");
                report.failed += 1;
            }
        }
    }

    report.batches.push(batch.len());
    batch.clear();
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;
