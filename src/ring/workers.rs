//! # ConsumerPool: fixed set of OS threads draining the ring.
//!
//! The pool is created with the dispatcher and lives as long as it does. Each
//! worker runs the same drain loop; the ring's read-cursor CAS partitions slots
//! across workers, so a slot is handled by exactly one of them.
//!
//! ```text
//!   RingBuffer ──consume()──► worker 0 ─► body(0)
//!              ──consume()──► worker 1 ─► body(1)
//!              ──consume()──► worker N ─► body(N)
//! ```
//!
//! The body returns when the ring is closed and drained; [`ConsumerPool::join`]
//! waits for every worker to get there.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

/// Handles of the running consumer threads.
pub(crate) struct ConsumerPool {
    workers: Vec<JoinHandle<()>>,
}

impl ConsumerPool {
    /// Spawns `count` named threads, each running `body(index)`.
    pub(crate) fn spawn(
        name: &str,
        count: usize,
        body: Arc<dyn Fn(usize) + Send + Sync>,
    ) -> io::Result<Self> {
        let mut workers = Vec::with_capacity(count);
        for index in 0..count {
            let body = Arc::clone(&body);
            let handle = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || {
                    debug!(worker = index, "consumer started");
                    body(index);
                    debug!(worker = index, "consumer stopped");
                })?;
            workers.push(handle);
        }
        Ok(Self { workers })
    }

    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    /// Waits for every worker to finish its drain loop.
    pub(crate) fn join(self) {
        for handle in self.workers {
            if handle.join().is_err() {
                error!("consumer thread panicked outside observer isolation");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_spawns_and_joins_every_worker() {
        let hits = Arc::new(AtomicUsize::new(0));
        let body: Arc<dyn Fn(usize) + Send + Sync> = {
            let hits = Arc::clone(&hits);
            Arc::new(move |index| {
                hits.fetch_add(index + 1, Ordering::SeqCst);
            })
        };

        let pool = ConsumerPool::spawn("test-worker", 3, body).unwrap();
        assert_eq!(pool.len(), 3);
        pool.join();
        assert_eq!(hits.load(Ordering::SeqCst), 1 + 2 + 3);
    }
}
