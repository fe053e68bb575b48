//! Output channels
//!
//! A channel is a FIFO of serialized lines in front of exactly one writable
//! destination. Each channel is owned by a dedicated worker task; callers
//! only ever send messages into its inbox, so enqueueing never blocks and
//! never waits on I/O.
//!
//! ```text
//! [LogSink::log] --Line--> [inbox] --> [worker: queue -> driver] --> [destination]
//! [flush()]      --Flush-> [inbox]        (resolves when queue empty + closed)
//! ```
//!
//! The worker drains its queue through a [`ChannelDriver`]. The file driver
//! adds batching, size rotation and daily rollover. The terminal driver
//! writes line by line.
//!
//! Lines are written in enqueue order. A line is never dropped because of a
//! transient I/O error: unwritten bytes stay with the driver, ahead of the
//! queue, and are retried after `RetryPolicy::delay` or on the next enqueue.

mod destination;
mod file;
mod metrics;
mod terminal;

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::flush::{FlushSynchronizer, Flushed};

pub use destination::{
    BoxedWriter, DEFAULT_RETRY_DELAY, DEFAULT_WRITE_ATTEMPTS, Destination, NullOpener,
    OpenWriter, RetryPolicy, StdoutOpener, WriteStatus,
};
pub use file::{CHUNK_LINES, FileDriver, RotationState};
pub use metrics::{ChannelMetrics, ChannelMetricsSnapshot};
pub use terminal::TerminalDriver;

/// Message sent to a channel worker
pub enum ChannelCommand {
    /// One serialized, newline-terminated line
    Line(String),
    /// Resolve once everything before this marker is written and closed
    Flush(oneshot::Sender<()>),
}

/// Which output a channel feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    File,
    Terminal,
    RawTerminal,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Terminal => "terminal",
            Self::RawTerminal => "raw_terminal",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one drain attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Queue is empty and every line was handed to the destination
    Complete,
    /// Could not make progress (open or write failed); retry later
    Stalled,
}

/// Destination-specific part of a channel worker
#[async_trait]
pub trait ChannelDriver: Send + 'static {
    /// Startup work before the first drain (directory, size probe)
    async fn provision(&mut self) {}

    /// Write as much of `queue` as possible, front first
    ///
    /// Bytes taken from `queue` but not yet written are kept by the driver
    /// as raw bytes and written before anything else on the next drain.
    /// Returns [`Drain::Complete`] only once nothing is left over.
    async fn drain(&mut self, queue: &mut VecDeque<String>) -> Drain;

    /// Settle the destination for a flush
    ///
    /// Returns false if buffered data could not be written; the driver
    /// keeps that data for the next drain.
    async fn close(&mut self) -> bool;
}

/// Caller side of a channel
#[derive(Clone)]
pub struct ChannelHandle {
    kind: ChannelKind,
    inbox: mpsc::UnboundedSender<ChannelCommand>,
    flush: Arc<FlushSynchronizer>,
    metrics: Arc<ChannelMetrics>,
}

impl ChannelHandle {
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Append a line to the channel queue
    ///
    /// Returns false only if the worker has stopped.
    pub fn enqueue(&self, line: String) -> bool {
        self.metrics.record_enqueued();
        if self.inbox.send(ChannelCommand::Line(line)).is_err() {
            tracing::debug!(channel = %self.kind, "channel worker stopped, line discarded");
            return false;
        }
        true
    }

    /// Signal that resolves when the channel is drained and closed
    pub fn flush(&self) -> Flushed {
        self.flush.request(&self.inbox)
    }

    pub fn metrics(&self) -> ChannelMetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("kind", &self.kind)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

/// Spawn a worker for `driver` and return its handle
///
/// The worker runs until every handle is dropped and its queue is drained.
pub fn spawn_channel<D: ChannelDriver>(
    kind: ChannelKind,
    stream: Arc<str>,
    driver: D,
    metrics: Arc<ChannelMetrics>,
    retry: RetryPolicy,
) -> (ChannelHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let worker = ChannelWorker {
        kind,
        stream,
        inbox: rx,
        retry,
    };
    let task = tokio::spawn(worker.run(driver));

    let handle = ChannelHandle {
        kind,
        inbox: tx,
        flush: Arc::new(FlushSynchronizer::new()),
        metrics,
    };
    (handle, task)
}

struct ChannelWorker {
    kind: ChannelKind,
    stream: Arc<str>,
    inbox: mpsc::UnboundedReceiver<ChannelCommand>,
    retry: RetryPolicy,
}

impl ChannelWorker {
    async fn run<D: ChannelDriver>(mut self, mut driver: D) {
        let mut queue: VecDeque<String> = VecDeque::new();
        let mut waiters: Vec<oneshot::Sender<()>> = Vec::new();
        let mut inbox_open = true;
        let mut stalled = false;
        let mut shutdown_attempts = 0usize;

        // Lines sent during provisioning wait in the inbox.
        driver.provision().await;

        loop {
            // A pending flush is a barrier: nothing sent after it is taken
            // in until it resolves.
            if inbox_open && waiters.is_empty() {
                if queue.is_empty() {
                    match self.inbox.recv().await {
                        Some(cmd) => accept(cmd, &mut queue, &mut waiters),
                        None => inbox_open = false,
                    }
                } else if stalled {
                    tokio::select! {
                        cmd = self.inbox.recv() => match cmd {
                            Some(cmd) => accept(cmd, &mut queue, &mut waiters),
                            None => inbox_open = false,
                        },
                        _ = tokio::time::sleep(self.retry.delay) => {}
                    }
                }

                while inbox_open && waiters.is_empty() {
                    match self.inbox.try_recv() {
                        Ok(cmd) => accept(cmd, &mut queue, &mut waiters),
                        Err(mpsc::error::TryRecvError::Empty) => break,
                        Err(mpsc::error::TryRecvError::Disconnected) => inbox_open = false,
                    }
                }
            } else if stalled {
                tokio::time::sleep(self.retry.delay).await;
            }

            stalled = driver.drain(&mut queue).await == Drain::Stalled;

            if !stalled && queue.is_empty() && !waiters.is_empty() {
                if driver.close().await {
                    for waiter in waiters.drain(..) {
                        let _ = waiter.send(());
                    }
                } else {
                    stalled = true;
                }
            }

            if !inbox_open {
                if queue.is_empty() && waiters.is_empty() && !stalled {
                    if driver.close().await {
                        break;
                    }
                    stalled = true;
                }

                if stalled {
                    shutdown_attempts += 1;
                    if shutdown_attempts > self.retry.max_attempts {
                        tracing::error!(
                            stream = %self.stream,
                            channel = %self.kind,
                            lines = queue.len(),
                            "giving up on unwritten lines at shutdown"
                        );
                        break;
                    }
                }
            }
        }

        tracing::debug!(stream = %self.stream, channel = %self.kind, "channel worker finished");
    }
}

fn accept(
    cmd: ChannelCommand,
    queue: &mut VecDeque<String>,
    waiters: &mut Vec<oneshot::Sender<()>>,
) {
    match cmd {
        ChannelCommand::Line(line) => queue.push_back(line),
        ChannelCommand::Flush(done) => waiters.push(done),
    }
}
