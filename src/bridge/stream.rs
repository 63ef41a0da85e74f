//! # BridgeStream: the pull side of a bridge.
//!
//! Each pull waits on `not_empty` for at most the poll timeout, then re-checks the
//! cancellation token, so a cancelled stream ends within one timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::CloseAction;
use super::channel::Inner;

/// Lazy pull sequence over a [`Bridge`](super::Bridge).
///
/// `next()` blocks until an element is available, the bridge is completed and
/// drained, or the stream is cancelled. Several streams over one bridge compete
/// for elements; each element is yielded once.
pub struct BridgeStream<T> {
    inner: Arc<Inner<T>>,
    on_close: Option<CloseAction>,
    poll_timeout: Duration,
    token: CancellationToken,
    finished: bool,
}

impl<T> BridgeStream<T> {
    pub(super) fn new(
        inner: Arc<Inner<T>>,
        on_close: Option<CloseAction>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            inner,
            on_close,
            poll_timeout,
            token: CancellationToken::new(),
            finished: false,
        }
    }

    /// Token that cancels this stream from any thread.
    ///
    /// A pull in progress notices cancellation within one poll timeout.
    pub fn cancel_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancels the stream and runs the close action now.
    pub fn cancel(&mut self) {
        self.token.cancel();
        self.finish();
    }

    /// True once the stream ended or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Some(action) = self.on_close.take() {
            trace!(cancelled = self.token.is_cancelled(), "bridge stream closed");
            action();
        }
    }
}

impl<T> Iterator for BridgeStream<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.finished {
            return None;
        }
        let inner = Arc::clone(&self.inner);
        let mut state = inner.state.lock();
        loop {
            if self.token.is_cancelled() {
                drop(state);
                self.finish();
                return None;
            }
            if let Some(item) = state.queue.pop_front() {
                drop(state);
                inner.not_full.notify_one();
                return Some(item);
            }
            if state.completed {
                drop(state);
                self.finish();
                return None;
            }
            inner.not_empty.wait_for(&mut state, self.poll_timeout);
        }
    }
}

impl<T> Drop for BridgeStream<T> {
    fn drop(&mut self) {
        self.finish();
    }
}
