//! # Dispatch metrics.
//!
//! Coarse totals are always tracked with relaxed atomics. Fine-grained per-key
//! counters are opt-in through
//! [`EventBus::enable_metrics_tracking`](crate::EventBus::enable_metrics_tracking)
//! and cost one concurrent-map lookup per recorded event.
//!
//! ## Counters
//! | Counter               | Incremented when                                           |
//! |-----------------------|------------------------------------------------------------|
//! | `emitted`             | `emit` accepted the call (bus open)                        |
//! | `dispatched`          | an event reached its observers                             |
//! | `dropped_no_listener` | no observer existed at emit time or at drain time          |
//! | `dropped_full`        | ring full under `OverflowPolicy::Drop`                     |
//! | `rejected_full`       | ring full under `OverflowPolicy::Throw`                    |
//! | `coalesced`           | a pending payload was replaced in place                    |
//! | `queued_for_later`    | ring full under `OverflowPolicy::QueueForLater`            |
//! | `observer_failures`   | an observer returned `Err` or panicked                     |
//! | `waits`               | a producer blocked under `OverflowPolicy::WaitUntilAvailable` |
//!
//! `queue_depth` is a gauge read from the ring cursors when the snapshot is taken.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;

/// Point-in-time copy of the bus totals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub emitted: u64,
    pub dispatched: u64,
    pub dropped_no_listener: u64,
    pub dropped_full: u64,
    pub rejected_full: u64,
    pub coalesced: u64,
    pub queued_for_later: u64,
    pub observer_failures: u64,
    /// Producers that blocked for a slot.
    pub waits: u64,
    /// Sum of producer wait latencies.
    pub wait_time_total: Duration,
    /// Longest single producer wait.
    pub wait_time_max: Duration,
    /// Claimed-but-not-drained slots.
    pub queue_depth: usize,
    /// Slots drained per consumer thread (index = worker).
    pub worker_drained: Vec<u64>,
}

/// Per-key counters, available for keys with tracking enabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyMetrics {
    pub emitted: u64,
    pub dispatched: u64,
    /// Dropped for no listener, full ring, or rejected with `RingFull`.
    pub dropped: u64,
    pub coalesced: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Counter {
    Emitted,
    Dispatched,
    DroppedNoListener,
    DroppedFull,
    RejectedFull,
    Coalesced,
    QueuedForLater,
    ObserverFailure,
}

#[derive(Default)]
struct Totals {
    emitted: AtomicU64,
    dispatched: AtomicU64,
    dropped_no_listener: AtomicU64,
    dropped_full: AtomicU64,
    rejected_full: AtomicU64,
    coalesced: AtomicU64,
    queued_for_later: AtomicU64,
    observer_failures: AtomicU64,
    waits: AtomicU64,
    wait_nanos_total: AtomicU64,
    wait_nanos_max: AtomicU64,
}

#[derive(Default)]
struct KeyCounters {
    emitted: AtomicU64,
    dispatched: AtomicU64,
    dropped: AtomicU64,
    coalesced: AtomicU64,
}

/// Metrics collector owned by one bus.
pub(crate) struct Metrics<K> {
    totals: Totals,
    workers: Box<[AtomicU64]>,
    tracked: DashMap<K, KeyCounters>,
}

impl<K: Eq + Hash> Metrics<K> {
    pub(crate) fn new(workers: usize) -> Self {
        Self {
            totals: Totals::default(),
            workers: (0..workers).map(|_| AtomicU64::new(0)).collect(),
            tracked: DashMap::new(),
        }
    }

    pub(crate) fn incr(&self, counter: Counter, key: &K) {
        let t = &self.totals;
        let total = match counter {
            Counter::Emitted => &t.emitted,
            Counter::Dispatched => &t.dispatched,
            Counter::DroppedNoListener => &t.dropped_no_listener,
            Counter::DroppedFull => &t.dropped_full,
            Counter::RejectedFull => &t.rejected_full,
            Counter::Coalesced => &t.coalesced,
            Counter::QueuedForLater => &t.queued_for_later,
            Counter::ObserverFailure => &t.observer_failures,
        };
        total.fetch_add(1, Ordering::Relaxed);

        if let Some(k) = self.tracked.get(key) {
            let per_key = match counter {
                Counter::Emitted => &k.emitted,
                Counter::Dispatched => &k.dispatched,
                Counter::DroppedNoListener | Counter::DroppedFull | Counter::RejectedFull => {
                    &k.dropped
                }
                Counter::Coalesced => &k.coalesced,
                Counter::QueuedForLater | Counter::ObserverFailure => return,
            };
            per_key.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_wait(&self, waited: Duration) {
        let nanos = waited.as_nanos().min(u128::from(u64::MAX)) as u64;
        self.totals.waits.fetch_add(1, Ordering::Relaxed);
        self.totals
            .wait_nanos_total
            .fetch_add(nanos, Ordering::Relaxed);
        self.totals.wait_nanos_max.fetch_max(nanos, Ordering::Relaxed);
    }

    pub(crate) fn worker_drained(&self, worker: usize) {
        if let Some(c) = self.workers.get(worker) {
            c.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn track(&self, key: K) {
        self.tracked.entry(key).or_default();
    }

    pub(crate) fn untrack(&self, key: &K) {
        self.tracked.remove(key);
    }

    pub(crate) fn key_metrics(&self, key: &K) -> Option<KeyMetrics> {
        self.tracked.get(key).map(|k| KeyMetrics {
            emitted: k.emitted.load(Ordering::Relaxed),
            dispatched: k.dispatched.load(Ordering::Relaxed),
            dropped: k.dropped.load(Ordering::Relaxed),
            coalesced: k.coalesced.load(Ordering::Relaxed),
        })
    }

    pub(crate) fn snapshot(&self, queue_depth: usize) -> MetricsSnapshot {
        let t = &self.totals;
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            emitted: load(&t.emitted),
            dispatched: load(&t.dispatched),
            dropped_no_listener: load(&t.dropped_no_listener),
            dropped_full: load(&t.dropped_full),
            rejected_full: load(&t.rejected_full),
            coalesced: load(&t.coalesced),
            queued_for_later: load(&t.queued_for_later),
            observer_failures: load(&t.observer_failures),
            waits: load(&t.waits),
            wait_time_total: Duration::from_nanos(load(&t.wait_nanos_total)),
            wait_time_max: Duration::from_nanos(load(&t.wait_nanos_max)),
            queue_depth,
            worker_drained: self.workers.iter().map(load).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_always_tracked() {
        let m: Metrics<&str> = Metrics::new(1);
        m.incr(Counter::Emitted, &"a");
        m.incr(Counter::DroppedNoListener, &"a");
        m.incr(Counter::Emitted, &"b");

        let s = m.snapshot(0);
        assert_eq!(s.emitted, 2);
        assert_eq!(s.dropped_no_listener, 1);
        assert!(m.key_metrics(&"a").is_none());
    }

    #[test]
    fn test_per_key_only_after_tracking() {
        let m: Metrics<&str> = Metrics::new(1);
        m.incr(Counter::Emitted, &"a");
        m.track("a");
        m.incr(Counter::Emitted, &"a");
        m.incr(Counter::DroppedFull, &"a");
        m.incr(Counter::RejectedFull, &"a");
        m.incr(Counter::Coalesced, &"a");
        m.incr(Counter::Emitted, &"b");

        assert_eq!(
            m.key_metrics(&"a"),
            Some(KeyMetrics {
                emitted: 1,
                dispatched: 0,
                dropped: 2,
                coalesced: 1,
            })
        );

        m.untrack(&"a");
        assert!(m.key_metrics(&"a").is_none());
        assert_eq!(m.snapshot(0).emitted, 3);
    }

    #[test]
    fn test_wait_latency_total_and_max() {
        let m: Metrics<u8> = Metrics::new(0);
        m.record_wait(Duration::from_millis(2));
        m.record_wait(Duration::from_millis(5));

        let s = m.snapshot(0);
        assert_eq!(s.waits, 2);
        assert_eq!(s.wait_time_total, Duration::from_millis(7));
        assert_eq!(s.wait_time_max, Duration::from_millis(5));
    }

    #[test]
    fn test_worker_counters_ignore_unknown_index() {
        let m: Metrics<u8> = Metrics::new(2);
        m.worker_drained(1);
        m.worker_drained(1);
        m.worker_drained(9);
        assert_eq!(m.snapshot(3).worker_drained, vec![0, 2]);
        assert_eq!(m.snapshot(3).queue_depth, 3);
    }
}
