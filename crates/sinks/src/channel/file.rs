//! File channel driver: batching, size rotation and daily rollover
//!
//! Queued lines are concatenated into batches of up to 80% of the write
//! buffer before each physical write. A batch is also cut when it would
//! take the active file to its size limit, when it holds [`CHUNK_LINES`]
//! lines, or when the queue runs dry.
//!
//! Once the active file reaches its limit it is closed and renamed
//! `<stream>_<date>_<NNN>.log`, where NNN counts the rotated files that
//! already exist for that stream and date. A fresh active file is opened
//! right away.
//!
//! ```text
//! api_2024-03-10.log       active
//! api_2024-03-10_000.log   first rotation
//! api_2024-03-10_001.log   second rotation
//! ```

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::fs::{File, OpenOptions};

use super::destination::{Destination, RetryPolicy, WriteStatus};
use super::metrics::ChannelMetrics;
use super::{ChannelDriver, Drain};
use crate::clock::SharedClock;
use crate::naming::{active_file_name, indexed_file_name, parse_file_name};
use crate::provision::{DirectoryProvisioner, probe_file_size};
use crate::util::RateLimitedLogger;

/// Maximum lines per physical write
pub const CHUNK_LINES: usize = 5000;

/// Batch size as a percentage of the write buffer
const BATCH_TARGET_PERCENT: usize = 80;

/// Upper bound on the batch buffer allocated up front
const MAX_BATCH_CAPACITY: usize = 1024 * 1024;

/// Size accounting for the active file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationState {
    /// Name of the open active file, cleared while rotating
    pub current_filename: Option<String>,
    /// Bytes in the active file (probed at startup, then counted)
    pub cached_bytes_written: u64,
    pub max_bytes_per_file: u64,
    /// Set while the active file is being closed and renamed
    pub indexing: bool,
}

impl RotationState {
    pub fn new(max_bytes_per_file: u64) -> Self {
        Self {
            current_filename: None,
            cached_bytes_written: 0,
            max_bytes_per_file,
            indexing: false,
        }
    }

    /// Whether appending `len` more bytes reaches the size limit
    pub fn would_reach_limit(&self, len: usize) -> bool {
        self.cached_bytes_written.saturating_add(len as u64) >= self.max_bytes_per_file
    }

    pub fn needs_rotation(&self) -> bool {
        !self.indexing && self.cached_bytes_written >= self.max_bytes_per_file
    }
}

/// Drives the file channel of one stream
pub struct FileDriver {
    stream: Arc<str>,
    provisioner: DirectoryProvisioner,
    clock: SharedClock,
    rotation: RotationState,
    active_date: NaiveDate,
    destination: Option<Destination>,
    /// Bytes a failed close left unwritten, written first to the next destination
    carry: Vec<u8>,
    buffer_bytes: usize,
    retry: RetryPolicy,
    metrics: Arc<ChannelMetrics>,
    errors: RateLimitedLogger,
}

impl FileDriver {
    pub fn new(
        stream: Arc<str>,
        base_dir: impl Into<PathBuf>,
        max_bytes_per_file: u64,
        clock: SharedClock,
        metrics: Arc<ChannelMetrics>,
    ) -> Self {
        let active_date = clock.today();
        Self {
            errors: RateLimitedLogger::for_stream(Arc::clone(&stream)),
            stream,
            provisioner: DirectoryProvisioner::new(base_dir),
            clock,
            rotation: RotationState::new(max_bytes_per_file),
            active_date,
            destination: None,
            carry: Vec::new(),
            buffer_bytes: spool_config::DEFAULT_BUFFER_SIZE_KB * 1024,
            retry: RetryPolicy::default(),
            metrics,
        }
    }

    /// Set the write buffer size (high-water mark)
    pub fn with_buffer_bytes(mut self, buffer_bytes: usize) -> Self {
        self.buffer_bytes = buffer_bytes.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn rotation(&self) -> &RotationState {
        &self.rotation
    }

    fn dir(&self) -> &Path {
        self.provisioner.dir()
    }

    fn active_path(&self) -> PathBuf {
        self.dir()
            .join(active_file_name(&self.stream, self.active_date))
    }

    fn batch_target(&self) -> usize {
        (self.buffer_bytes.saturating_mul(BATCH_TARGET_PERCENT) / 100).max(1)
    }

    fn has_pending(&self) -> bool {
        !self.carry.is_empty() || self.destination.as_ref().is_some_and(Destination::has_pending)
    }

    /// Open the active file for appending
    async fn open(&mut self) -> io::Result<()> {
        self.provisioner.ensure().await?;

        let name = active_file_name(&self.stream, self.active_date);
        let path = self.dir().join(&name);
        let file = match open_append(&path).await {
            // directory removed underneath us
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.provisioner.invalidate();
                self.provisioner.ensure().await?;
                open_append(&path).await?
            }
            other => other?,
        };

        let mut destination = Destination::new(
            path.display().to_string(),
            Box::new(file),
            self.buffer_bytes,
            self.retry,
            Arc::clone(&self.metrics),
        );
        // already counted when first buffered
        if !self.carry.is_empty() {
            destination.write(&std::mem::take(&mut self.carry));
        }
        self.destination = Some(destination);
        self.rotation.current_filename = Some(name);
        self.metrics.set_destination_open(true);
        tracing::debug!(stream = %self.stream, path = %path.display(), "opened log file");
        Ok(())
    }

    async fn open_or_report(&mut self) -> bool {
        match self.open().await {
            Ok(()) => true,
            Err(e) => {
                self.metrics.record_open_failure();
                self.errors.error("failed to open log file", &e);
                false
            }
        }
    }

    /// Close the active file
    ///
    /// On failure the unwritten bytes are carried over to the next open,
    /// ahead of anything still queued, and no handle stays open.
    async fn close_destination(&mut self) -> bool {
        let Some(mut dest) = self.destination.take() else {
            return true;
        };
        self.metrics.set_destination_open(false);

        match dest.close().await {
            Ok(()) => true,
            Err(e) => {
                self.carry.extend(dest.take_unwritten());
                self.errors.error("failed to close log file", &e);
                false
            }
        }
    }

    /// Switch to a new active file when the date has changed
    async fn check_rollover(&mut self) -> bool {
        let today = self.clock.today();
        if today == self.active_date {
            return true;
        }
        if !self.close_destination().await {
            return false;
        }

        tracing::info!(
            stream = %self.stream,
            from = %self.active_date,
            to = %today,
            "daily log rollover"
        );
        self.active_date = today;
        self.rotation.current_filename = None;
        // carried bytes land in the new file
        self.rotation.cached_bytes_written =
            probe_file_size(&self.active_path()).await + self.carry.len() as u64;
        self.metrics.record_rollover();
        true
    }

    /// Hand one batch to the destination
    async fn write_batch(&mut self, batch: &str, lines: u64) -> io::Result<()> {
        let Some(dest) = self.destination.as_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "log file is not open",
            ));
        };

        let status = dest.write(batch.as_bytes());
        self.metrics.record_write(lines);
        self.rotation.cached_bytes_written += batch.len() as u64;

        if status == WriteStatus::Backpressure {
            self.metrics.record_backpressure();
            dest.drained().await?;
        }
        Ok(())
    }

    /// Close the active file, rename it to the next index, open a new one
    async fn rotate(&mut self) -> bool {
        if self.rotation.indexing {
            return true;
        }
        self.rotation.indexing = true;

        let filename = self.rotation.current_filename.take();
        if !self.close_destination().await {
            self.rotation.current_filename = filename;
            self.rotation.indexing = false;
            return false;
        }

        if let Some(filename) = filename {
            match self.rename_to_next_index(&filename).await {
                Ok(rotated) => {
                    tracing::info!(
                        stream = %self.stream,
                        file = %rotated,
                        bytes = self.rotation.cached_bytes_written,
                        "rotated log file"
                    );
                    self.metrics.record_rotation();
                    self.rotation.cached_bytes_written = 0;
                }
                Err(e) => {
                    // keep appending to the same file and try again after the next write
                    self.errors.error("failed to rotate log file", &e);
                }
            }
        }

        self.rotation.indexing = false;
        self.open_or_report().await
    }

    async fn rename_to_next_index(&self, filename: &str) -> io::Result<String> {
        let date = parse_file_name(filename)
            .map(|parsed| parsed.date)
            .unwrap_or(self.active_date);
        let sequence = next_sequence(self.dir(), &self.stream, date).await?;
        let rotated = indexed_file_name(&self.stream, date, sequence);

        tokio::fs::rename(self.dir().join(filename), self.dir().join(&rotated)).await?;
        Ok(rotated)
    }
}

#[async_trait]
impl ChannelDriver for FileDriver {
    async fn provision(&mut self) {
        if let Err(e) = self.provisioner.ensure().await {
            // retried on the first open
            self.errors.error("failed to create log directory", &e);
        }
        self.active_date = self.clock.today();
        self.rotation.cached_bytes_written = probe_file_size(&self.active_path()).await;
        tracing::debug!(
            stream = %self.stream,
            dir = %self.dir().display(),
            existing_bytes = self.rotation.cached_bytes_written,
            "file channel ready"
        );
    }

    async fn drain(&mut self, queue: &mut VecDeque<String>) -> Drain {
        if queue.is_empty() && !self.has_pending() {
            return Drain::Complete;
        }
        if !self.check_rollover().await {
            return Drain::Stalled;
        }
        if self.destination.is_none() && !self.open_or_report().await {
            return Drain::Stalled;
        }

        // bytes left over from a failed write go first
        if let Some(dest) = self.destination.as_mut()
            && let Err(e) = dest.drained().await
        {
            self.errors.error("failed to write log file", &e);
            return Drain::Stalled;
        }
        // a rotation that failed earlier
        if self.rotation.needs_rotation() && !self.rotate().await {
            return Drain::Stalled;
        }

        let target = self.batch_target();
        let mut batch = String::with_capacity(target.min(MAX_BATCH_CAPACITY));
        let mut lines = 0u64;

        while let Some(line) = queue.pop_front() {
            batch.push_str(&line);
            lines += 1;

            let cut = batch.len() >= target
                || self.rotation.would_reach_limit(batch.len())
                || lines as usize >= CHUNK_LINES
                || queue.is_empty();
            if !cut {
                continue;
            }

            if let Err(e) = self.write_batch(&batch, lines).await {
                self.errors.error("failed to write log file", &e);
                return Drain::Stalled;
            }
            batch.clear();
            lines = 0;

            if self.rotation.needs_rotation() && !self.rotate().await {
                return Drain::Stalled;
            }
            if self.destination.is_none() {
                return Drain::Stalled;
            }
        }

        if let Some(dest) = self.destination.as_mut()
            && let Err(e) = dest.drained().await
        {
            self.errors.error("failed to write log file", &e);
            return Drain::Stalled;
        }
        Drain::Complete
    }

    async fn close(&mut self) -> bool {
        self.close_destination().await
    }
}

async fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path).await
}

/// Next free rotation index for `stream` on `date`
async fn next_sequence(dir: &Path, stream: &str, date: NaiveDate) -> io::Result<u32> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut count = 0u32;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if let Some(parsed) = name.to_str().and_then(parse_file_name)
            && parsed.is_indexed()
            && parsed.stream == stream
            && parsed.date == date
        {
            count += 1;
        }
    }

    // gaps left by deleted files
    let mut sequence = count;
    while tokio::fs::try_exists(dir.join(indexed_file_name(stream, date, sequence))).await? {
        sequence += 1;
    }
    Ok(sequence)
}

#[cfg(test)]
#[path = "file_test.rs"]
mod file_test;
