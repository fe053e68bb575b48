//! Writable destinations with a high-water mark
//!
//! A destination buffers accepted bytes and reports backpressure once the
//! buffer reaches its high-water mark. The channel worker then awaits
//! [`Destination::drained`], which hands the buffer to the underlying
//! writer (with retries) before more data is accepted.
//!
//! Bytes that could not be written stay buffered. They are retried on the
//! next drain, or recovered with [`Destination::take_unwritten`] when the
//! destination is abandoned.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::metrics::ChannelMetrics;

/// Any async byte sink
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Sync + Unpin>;

/// Default write attempts before a failure is reported
pub const DEFAULT_WRITE_ATTEMPTS: usize = 3;

/// Default delay between write attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Write retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per physical write (at least 1)
    pub max_attempts: usize,
    /// Delay between attempts, also used by the worker between stalled drains
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_WRITE_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Result of handing data to a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// Below the high-water mark, keep writing
    Accepted,
    /// At or above the high-water mark, await `drained` first
    Backpressure,
}

/// One open writable resource
pub struct Destination {
    label: String,
    writer: BoxedWriter,
    pending: Vec<u8>,
    high_water_mark: usize,
    retry: RetryPolicy,
    metrics: Arc<ChannelMetrics>,
}

impl Destination {
    pub fn new(
        label: impl Into<String>,
        writer: BoxedWriter,
        high_water_mark: usize,
        retry: RetryPolicy,
        metrics: Arc<ChannelMetrics>,
    ) -> Self {
        Self {
            label: label.into(),
            writer,
            pending: Vec::with_capacity(high_water_mark.min(1024 * 1024)),
            high_water_mark: high_water_mark.max(1),
            retry,
            metrics,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Buffer `data`
    pub fn write(&mut self, data: &[u8]) -> WriteStatus {
        self.pending.extend_from_slice(data);
        if self.pending.len() >= self.high_water_mark {
            WriteStatus::Backpressure
        } else {
            WriteStatus::Accepted
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Hand all buffered bytes to the writer and flush it
    ///
    /// Retries according to the retry policy. On failure the unwritten
    /// remainder stays buffered.
    pub async fn drained(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.write_pending().await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < max_attempts => {
                    tracing::warn!(
                        destination = %self.label,
                        attempt,
                        max_attempts,
                        error = %e,
                        "write failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => {
                    self.metrics.record_write_error();
                    return Err(e);
                }
            }
        }
    }

    async fn write_pending(&mut self) -> io::Result<()> {
        while !self.pending.is_empty() {
            let n = self.writer.write(&self.pending).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "destination accepted no bytes",
                ));
            }
            self.pending.drain(..n);
            self.metrics.record_bytes(n as u64);
        }
        self.writer.flush().await
    }

    /// Drain and shut the writer down
    pub async fn close(&mut self) -> io::Result<()> {
        self.drained().await?;
        self.writer.shutdown().await
    }

    /// Take bytes that never reached the writer
    pub fn take_unwritten(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending)
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("label", &self.label)
            .field("pending", &self.pending.len())
            .field("high_water_mark", &self.high_water_mark)
            .finish()
    }
}

/// Opens the writer behind a terminal channel
#[async_trait]
pub trait OpenWriter: Send + Sync + fmt::Debug {
    /// Name used in diagnostics
    fn label(&self) -> &str;

    async fn open(&self) -> io::Result<BoxedWriter>;
}

/// Process standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutOpener;

#[async_trait]
impl OpenWriter for StdoutOpener {
    fn label(&self) -> &str {
        "stdout"
    }

    async fn open(&self) -> io::Result<BoxedWriter> {
        Ok(Box::new(tokio::io::stdout()))
    }
}

/// Discards everything (benchmark mode)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOpener;

#[async_trait]
impl OpenWriter for NullOpener {
    fn label(&self) -> &str {
        "null"
    }

    async fn open(&self) -> io::Result<BoxedWriter> {
        Ok(Box::new(tokio::io::sink()))
    }
}
