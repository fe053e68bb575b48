//! In-memory writers for channel tests

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWrite;

use crate::channel::{BoxedWriter, OpenWriter};

#[derive(Debug, Default)]
struct Inner {
    buffer: Mutex<Vec<u8>>,
    fail_writes: AtomicUsize,
    short_write: Mutex<Option<(usize, usize)>>,
    shut_down: AtomicBool,
}

/// Shared in-memory byte sink with failure injection
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    inner: Arc<Inner>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` write calls
    pub fn fail_next_writes(&self, n: usize) {
        self.inner.fail_writes.store(n, Ordering::SeqCst);
    }

    /// Accept only `len` bytes on the next write call, then fail the
    /// `failures` calls after it
    pub fn short_write_then_fail(&self, len: usize, failures: usize) {
        *self.inner.short_write.lock() = Some((len, failures));
    }

    pub fn contents(&self) -> Vec<u8> {
        self.inner.buffer.lock().clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.contents()).unwrap()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if take_one(&self.inner.fail_writes) {
            return Poll::Ready(Err(io::Error::other("injected write failure")));
        }
        let len = match self.inner.short_write.lock().take() {
            Some((len, failures)) => {
                self.inner.fail_writes.store(failures, Ordering::SeqCst);
                len.min(buf.len())
            }
            None => buf.len(),
        };
        self.inner.buffer.lock().extend_from_slice(&buf[..len]);
        Poll::Ready(Ok(len))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.inner.shut_down.store(true, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

/// Opens handles onto one shared [`MemoryWriter`]
#[derive(Debug, Default)]
pub struct MemoryOpener {
    writer: MemoryWriter,
    fail_opens: AtomicUsize,
    opens: AtomicUsize,
}

impl MemoryOpener {
    pub fn new(writer: MemoryWriter) -> Self {
        Self {
            writer,
            ..Self::default()
        }
    }

    pub fn fail_next_opens(&self, n: usize) {
        self.fail_opens.store(n, Ordering::SeqCst);
    }

    pub fn open_calls(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OpenWriter for MemoryOpener {
    fn label(&self) -> &str {
        "memory"
    }

    async fn open(&self) -> io::Result<BoxedWriter> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.fail_opens) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected open failure",
            ));
        }
        Ok(Box::new(self.writer.clone()))
    }
}
