use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

type CloseFn = Box<dyn Fn() -> std::io::Result<()> + Send + Sync>;

/// Closes a byte stream from a thread other than the one reading it.
///
/// This is the single intentional point of concurrent access to a stream
/// owned by a receiver worker. Closing is idempotent: only the first call
/// runs the close action, and errors from it are logged, never returned.
#[derive(Clone)]
pub struct CloseHandle {
    inner: Arc<CloseInner>,
}

struct CloseInner {
    closed: AtomicBool,
    action: CloseFn,
}

impl CloseHandle {
    /// Create a handle that runs `action` on the first call to [`close`](Self::close).
    pub fn new<F>(action: F) -> Self
    where
        F: Fn() -> std::io::Result<()> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(CloseInner {
                closed: AtomicBool::new(false),
                action: Box::new(action),
            }),
        }
    }

    /// A handle with nothing to close (in-memory readers, captured files).
    pub fn noop() -> Self {
        Self::new(|| Ok(()))
    }

    /// Close the stream. Safe to call any number of times from any thread.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(err) = (self.inner.action)() {
            // NotConnected when the peer already went away.
            debug!(error = %err, "error while closing stream (ignored)");
        }
    }

    /// Whether [`close`](Self::close) has been called on any clone of this handle.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for CloseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}
