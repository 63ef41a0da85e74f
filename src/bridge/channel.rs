//! # Bridge: the bounded buffer and its producer side.
//!
//! ```text
//! push(item)
//!   ├─ completed            ─► Err(StreamClosed)
//!   ├─ len < capacity       ─► push_back, notify one puller
//!   └─ full                 ─► wait(not_full), re-check
//! ```
//!
//! All clones of a [`Bridge`] and every stream taken from it share one `Inner`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::CloseAction;
use super::stream::BridgeStream;
use crate::error::BridgeError;

/// Default pull poll timeout.
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub(super) struct State<T> {
    pub(super) queue: VecDeque<T>,
    pub(super) completed: bool,
}

/// Buffer shared by every clone of a bridge and its streams.
pub(super) struct Inner<T> {
    pub(super) state: Mutex<State<T>>,
    pub(super) not_full: Condvar,
    pub(super) not_empty: Condvar,
    capacity: usize,
}

/// Bounded push → pull adapter.
///
/// Clones share the same buffer; hand one clone to each producer thread.
///
/// ## Example
/// ```rust
/// use std::thread;
/// use eventring::Bridge;
///
/// let bridge = Bridge::new(2);
/// let producer = {
///     let bridge = bridge.clone();
///     thread::spawn(move || {
///         for i in 0..10 {
///             bridge.push(i).unwrap();
///         }
///         bridge.complete();
///     })
/// };
///
/// let got: Vec<i32> = bridge.stream().collect();
/// producer.join().unwrap();
/// assert_eq!(got, (0..10).collect::<Vec<_>>());
/// ```
pub struct Bridge<T> {
    inner: Arc<Inner<T>>,
    on_close: Option<CloseAction>,
    poll_timeout: Duration,
}

impl<T> Bridge<T> {
    /// Creates a bridge buffering at most `capacity` elements (`0` → `1`).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    queue: VecDeque::with_capacity(capacity),
                    completed: false,
                }),
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
                capacity,
            }),
            on_close: None,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Sets the action run once by every stream taken from this bridge when it finishes.
    pub fn with_close_action<F>(mut self, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_close = Some(Arc::new(action));
        self
    }

    /// Sets how long one pull waits before re-checking cancellation (minimum 1 ms).
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout.max(Duration::from_millis(1));
        self
    }

    /// Appends `item`, blocking while the buffer is full.
    ///
    /// Returns [`BridgeError::StreamClosed`] if the bridge is (or becomes) completed.
    pub fn push(&self, item: T) -> Result<(), BridgeError> {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        loop {
            if state.completed {
                return Err(BridgeError::StreamClosed);
            }
            if state.queue.len() < inner.capacity {
                state.queue.push_back(item);
                drop(state);
                inner.not_empty.notify_one();
                return Ok(());
            }
            inner.not_full.wait(&mut state);
        }
    }

    /// Marks the bridge completed and wakes every blocked producer and stream.
    pub fn complete(&self) {
        let mut state = self.inner.state.lock();
        if state.completed {
            return;
        }
        state.completed = true;
        drop(state);
        self.inner.not_full.notify_all();
        self.inner.not_empty.notify_all();
    }

    /// Returns a new lazy pull sequence over the buffer.
    pub fn stream(&self) -> BridgeStream<T> {
        BridgeStream::new(
            Arc::clone(&self.inner),
            self.on_close.clone(),
            self.poll_timeout,
        )
    }

    /// Number of buffered elements.
    pub fn len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// True if no element is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once [`Bridge::complete`] was called.
    pub fn is_completed(&self) -> bool {
        self.inner.state.lock().completed
    }

    /// Maximum number of buffered elements.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl<T> Clone for Bridge<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            on_close: self.on_close.clone(),
            poll_timeout: self.poll_timeout,
        }
    }
}

impl<T> Default for Bridge<T> {
    /// Capacity-1 bridge: every push waits for the previous element to be pulled.
    fn default() -> Self {
        Self::new(1)
    }
}

impl<T> std::fmt::Debug for Bridge<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("capacity", &self.inner.capacity)
            .field("len", &self.len())
            .field("completed", &self.is_completed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_capacity_one_blocks_second_push_until_first_pulled() {
        let bridge: Bridge<&'static str> = Bridge::default();
        let mut stream = bridge.stream();
        bridge.push("A").unwrap();

        let pushed_b = Arc::new(AtomicBool::new(false));
        let producer = {
            let (bridge, pushed_b) = (bridge.clone(), Arc::clone(&pushed_b));
            thread::spawn(move || {
                bridge.push("B").unwrap();
                pushed_b.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!pushed_b.load(Ordering::SeqCst), "B must wait for A to be pulled");
        assert_eq!(bridge.len(), 1);

        assert_eq!(stream.next(), Some("A"));
        producer.join().unwrap();
        assert!(pushed_b.load(Ordering::SeqCst));
        assert_eq!(stream.next(), Some("B"));

        bridge.complete();
        assert_eq!(stream.next(), None);
    }

    #[test]
    fn test_buffer_never_exceeds_capacity() {
        let bridge: Bridge<u32> = Bridge::new(4);
        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let bridge = bridge.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        bridge.push(p * 50 + i).unwrap();
                    }
                })
            })
            .collect();

        let mut got = Vec::new();
        let mut max_len = 0;
        let mut stream = bridge.stream();
        while got.len() < 200 {
            max_len = max_len.max(bridge.len());
            if let Some(v) = stream.next() {
                got.push(v);
            }
        }
        for p in producers {
            p.join().unwrap();
        }

        assert!(max_len <= 4, "observed {max_len} buffered elements");
        got.sort_unstable();
        assert_eq!(got, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_push_after_complete_fails() {
        let bridge: Bridge<u32> = Bridge::new(2);
        bridge.complete();
        bridge.complete();
        assert_eq!(bridge.push(1), Err(BridgeError::StreamClosed));
        assert!(bridge.is_completed());
    }

    #[test]
    fn test_complete_wakes_blocked_push() {
        let bridge: Bridge<u32> = Bridge::new(1);
        bridge.push(1).unwrap();

        let producer = {
            let bridge = bridge.clone();
            thread::spawn(move || bridge.push(2))
        };
        thread::sleep(Duration::from_millis(30));
        bridge.complete();

        assert_eq!(producer.join().unwrap(), Err(BridgeError::StreamClosed));
        assert_eq!(bridge.stream().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_buffered_elements_survive_completion() {
        let bridge: Bridge<u32> = Bridge::new(3);
        for i in 0..3 {
            bridge.push(i).unwrap();
        }
        bridge.complete();
        assert_eq!(bridge.stream().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(bridge.is_empty());
    }

    #[test]
    fn test_close_action_runs_once_per_stream() {
        let closes = Arc::new(AtomicUsize::new(0));
        let bridge: Bridge<u32> = {
            let closes = Arc::clone(&closes);
            Bridge::new(1).with_close_action(move || {
                closes.fetch_add(1, Ordering::SeqCst);
            })
        };
        bridge.complete();

        let mut ended = bridge.stream();
        assert_eq!(ended.next(), None);
        assert_eq!(ended.next(), None);
        drop(ended);
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        drop(bridge.stream());
        assert_eq!(closes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let bridge: Bridge<u8> = Bridge::new(0);
        assert_eq!(bridge.capacity(), 1);
    }
}
