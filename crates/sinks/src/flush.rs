//! Flush synchronization
//!
//! `flush()` sends a marker through the channel inbox. The worker resolves
//! it once every line queued before the marker has been written and the
//! destination is closed. Concurrent callers share one outstanding signal,
//! so a burst of `flush()` calls costs a single close.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::FutureExt;
use futures_util::future::Shared;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::channel::ChannelCommand;

type Signal = Shared<oneshot::Receiver<()>>;

/// Hands out flush signals for one channel
#[derive(Default)]
pub struct FlushSynchronizer {
    pending: Mutex<Option<Signal>>,
}

impl FlushSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that resolves once the channel is flushed
    ///
    /// Returns the outstanding signal if one has not resolved yet.
    pub(crate) fn request(&self, inbox: &mpsc::UnboundedSender<ChannelCommand>) -> Flushed {
        let mut pending = self.pending.lock();

        if let Some(signal) = pending.as_ref()
            && signal.clone().now_or_never().is_none()
        {
            return Flushed::waiting(signal.clone());
        }

        let (done_tx, done_rx) = oneshot::channel();
        if inbox.send(ChannelCommand::Flush(done_tx)).is_err() {
            // worker already finished, everything it accepted is written
            *pending = None;
            return Flushed::completed();
        }

        let signal = done_rx.shared();
        *pending = Some(signal.clone());
        Flushed::waiting(signal)
    }

    /// Whether a flush is outstanding
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|signal| signal.clone().now_or_never().is_none())
    }
}

/// Completion signal returned by `flush()`
///
/// Resolves when the channel is flushed, or when its worker has stopped.
#[must_use = "a flush does nothing unless awaited"]
pub struct Flushed {
    signal: Option<Signal>,
}

impl Flushed {
    fn waiting(signal: Signal) -> Self {
        Self {
            signal: Some(signal),
        }
    }

    /// Already-resolved signal (nothing to flush)
    pub fn completed() -> Self {
        Self { signal: None }
    }
}

impl fmt::Debug for FlushSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlushSynchronizer")
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl fmt::Debug for Flushed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flushed")
            .field("waiting", &self.signal.is_some())
            .finish()
    }
}

impl Future for Flushed {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.signal.as_mut() {
            None => Poll::Ready(()),
            // a dropped sender means the worker exited; nothing is left to wait for
            Some(signal) => signal.poll_unpin(cx).map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_concurrent_requests_share_one_marker() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sync = FlushSynchronizer::new();

        let first = sync.request(&tx);
        let second = sync.request(&tx);
        assert!(sync.is_pending());

        let Some(ChannelCommand::Flush(done)) = rx.recv().await else {
            panic!("expected flush marker");
        };
        assert!(rx.try_recv().is_err(), "second request must reuse the marker");

        done.send(()).unwrap();
        first.await;
        second.await;
        assert!(!sync.is_pending());
    }

    #[tokio::test]
    async fn test_new_marker_after_resolution() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sync = FlushSynchronizer::new();

        let first = sync.request(&tx);
        let Some(ChannelCommand::Flush(done)) = rx.recv().await else {
            panic!("expected flush marker");
        };
        done.send(()).unwrap();
        first.await;

        let _second = sync.request(&tx);
        assert!(matches!(rx.recv().await, Some(ChannelCommand::Flush(_))));
    }

    #[tokio::test]
    async fn test_closed_inbox_resolves_immediately() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sync = FlushSynchronizer::new();
        sync.request(&tx).await;
        assert!(!sync.is_pending());
    }

    #[tokio::test]
    async fn test_dropped_marker_resolves() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sync = FlushSynchronizer::new();
        let flushed = sync.request(&tx);
        drop(rx.recv().await);
        flushed.await;
    }

    #[tokio::test]
    async fn test_completed() {
        Flushed::completed().await;
    }
}
