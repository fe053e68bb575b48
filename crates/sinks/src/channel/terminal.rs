//! Terminal channel driver
//!
//! Writes lines one at a time to stdout (or the null device for benchmark
//! streams). The writer is opened lazily when the first line arrives and
//! kept open across flushes. Bytes the writer refused stay buffered in the
//! destination and go out before the next queued line.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;

use super::destination::{Destination, OpenWriter, RetryPolicy, WriteStatus};
use super::metrics::ChannelMetrics;
use super::{ChannelDriver, Drain};
use crate::util::RateLimitedLogger;

/// Drives a terminal or raw-terminal channel
pub struct TerminalDriver {
    opener: Arc<dyn OpenWriter>,
    destination: Option<Destination>,
    high_water_mark: usize,
    retry: RetryPolicy,
    metrics: Arc<ChannelMetrics>,
    errors: RateLimitedLogger,
}

impl TerminalDriver {
    pub fn new(
        stream: Arc<str>,
        opener: Arc<dyn OpenWriter>,
        high_water_mark: usize,
        retry: RetryPolicy,
        metrics: Arc<ChannelMetrics>,
    ) -> Self {
        Self {
            opener,
            destination: None,
            high_water_mark,
            retry,
            metrics,
            errors: RateLimitedLogger::for_stream(stream),
        }
    }

    fn has_pending(&self) -> bool {
        self.destination.as_ref().is_some_and(Destination::has_pending)
    }

    /// Open the writer if needed, false when that fails
    async fn ensure_open(&mut self) -> bool {
        if self.destination.is_some() {
            return true;
        }
        match self.opener.open().await {
            Ok(writer) => {
                self.destination = Some(Destination::new(
                    self.opener.label(),
                    writer,
                    self.high_water_mark,
                    self.retry,
                    Arc::clone(&self.metrics),
                ));
                self.metrics.set_destination_open(true);
                true
            }
            Err(e) => {
                self.metrics.record_open_failure();
                self.errors.error("failed to open terminal output", &e);
                false
            }
        }
    }
}

#[async_trait]
impl ChannelDriver for TerminalDriver {
    async fn drain(&mut self, queue: &mut VecDeque<String>) -> Drain {
        if queue.is_empty() && !self.has_pending() {
            return Drain::Complete;
        }
        if !self.ensure_open().await {
            return Drain::Stalled;
        }
        let Some(dest) = self.destination.as_mut() else {
            return Drain::Stalled;
        };
        let metrics = &self.metrics;

        // bytes left over from a failed write go first
        let mut result = dest.drained().await;
        while result.is_ok()
            && let Some(line) = queue.pop_front()
        {
            let status = dest.write(line.as_bytes());
            metrics.record_write(1);
            if status == WriteStatus::Backpressure {
                metrics.record_backpressure();
                result = dest.drained().await;
            }
        }

        // hand the tail to the terminal so output is not held back
        if result.is_ok() {
            result = dest.drained().await;
        }

        match result {
            Ok(()) => Drain::Complete,
            Err(e) => {
                self.errors.error("failed to write terminal output", &e);
                Drain::Stalled
            }
        }
    }

    async fn close(&mut self) -> bool {
        let Some(dest) = self.destination.as_mut() else {
            return true;
        };
        match dest.drained().await {
            Ok(()) => true,
            Err(e) => {
                self.errors.error("failed to flush terminal output", &e);
                false
            }
        }
    }
}
