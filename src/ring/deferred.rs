//! # Deferred: unbounded secondary worker for `QueueForLater`.
//!
//! Overflowed events are sent over an unbounded channel to one dedicated thread,
//! which hands them to a sink that blocks on `claim()` until space frees. Unbounded
//! growth is confined to this explicit queue rather than hidden in producer stacks.
//!
//! ```text
//! emit() ── ring full ──► tx.send(item) ──► [unbounded queue] ──► deferred thread ──► sink(item)
//!   └─ returns Ok(()) immediately                                    (blocking claim)
//! ```
//!
//! ## Rules
//! - `send` never blocks.
//! - Items are handed to the sink in send order; they carry no ordering guarantee
//!   against events claimed directly by producers meanwhile.
//! - [`Deferred::shutdown`] closes the queue; queued items are still delivered
//!   before the thread exits.

use std::io;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tracing::{debug, error};

/// Unbounded queue + dedicated worker thread.
pub(crate) struct Deferred<T> {
    tx: mpsc::UnboundedSender<T>,
    worker: JoinHandle<()>,
}

impl<T: Send + 'static> Deferred<T> {
    /// Spawns the worker thread that feeds every queued item to `sink`.
    pub(crate) fn spawn(name: &str, mut sink: impl FnMut(T) + Send + 'static) -> io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!("deferred worker started");
                while let Some(item) = rx.blocking_recv() {
                    sink(item);
                }
                debug!("deferred worker stopped");
            })?;
        Ok(Self { tx, worker })
    }

    /// Queues an item; hands it back if the worker is gone.
    pub(crate) fn send(&self, item: T) -> Result<(), T> {
        self.tx.send(item).map_err(|e| e.0)
    }

    /// Closes the queue and waits until every queued item was handed to the sink.
    pub(crate) fn shutdown(self) {
        drop(self.tx);
        if self.worker.join().is_err() {
            error!("deferred worker panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_items_delivered_in_send_order_before_shutdown_returns() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let deferred = {
            let seen = Arc::clone(&seen);
            Deferred::spawn("test-deferred", move |i: u32| seen.lock().unwrap().push(i)).unwrap()
        };

        for i in 0..100 {
            deferred.send(i).unwrap();
        }
        deferred.shutdown();
        assert_eq!(*seen.lock().unwrap(), (0..100).collect::<Vec<_>>());
    }
}
