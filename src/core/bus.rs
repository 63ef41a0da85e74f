//! # EventBus: per-key subscription façade over the ring dispatcher.
//!
//! The [`EventBus`] owns the observer registry, the coalescing registry, the
//! metrics collector and (in ring-backed mode) the ring buffer, its consumer pool
//! and the deferred worker. Nothing is global: every bus is an independent
//! instance, torn down by [`EventBus::shutdown`] or on drop.
//!
//! ## Emit path
//! ```text
//! emit(key, data)
//!   ├─ bus closed                          ─► Err(Closed)
//!   ├─ no observer for key                 ─► dropped_no_listener++, (warn), Ok
//!   ├─ CurrentThread                       ─► dispatch(key, data) in the caller
//!   └─ RingBacked
//!        ├─ coalescing enabled for key     ─► replace pending payload, or claim + publish
//!        ├─ slot claimed                   ─► fill + publish
//!        └─ ring full ─► OverflowPolicy
//!               ├─ Drop                    ─► dropped_full++, Ok
//!               ├─ Throw                   ─► Err(RingFull)
//!               ├─ QueueForLater           ─► deferred queue, Ok
//!               └─ WaitUntilAvailable      ─► blocking claim, wait latency recorded
//! ```
//!
//! ## Drain path (consumer thread)
//! ```text
//! consume() ─► take slot ─► observers(key) at drain time ─► on_event() each (isolated)
//!           ─► release slot ─► forget coalescing entry
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use eventring::{Config, EventBus};
//!
//! let bus: EventBus<&'static str, u64> = EventBus::new(Config::default()).unwrap();
//!
//! let total = Arc::new(AtomicU64::new(0));
//! let sub = {
//!     let total = Arc::clone(&total);
//!     bus.subscribe_fn("price", move |v: &u64| {
//!         total.fetch_add(*v, Ordering::SeqCst);
//!     })
//! };
//!
//! bus.emit("price", 5).unwrap();
//! bus.emit("price", 7).unwrap();
//! bus.shutdown(); // drains published events
//!
//! assert_eq!(total.load(Ordering::SeqCst), 12);
//! sub.cancel();
//! ```

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, trace, warn};

use super::builder::EventBusBuilder;
use super::coalesce::{Coalescer, IdProvider, Pending};
use super::config::Config;
use super::registry::ObserverRegistry;
use super::{EventKey, Identity, Payload};
use crate::error::DispatchError;
use crate::metrics::{Counter, KeyMetrics, Metrics, MetricsSnapshot};
use crate::observers::{Observe, ObserverFn, ObserverRef, Subscription};
use crate::policies::{OverflowPolicy, ProducerArity};
use crate::ring::{Claim, ConsumerPool, Deferred, RingBuffer};

/// Result of handing an event to the ring.
enum Admit<K, P> {
    Done,
    Defer(K, P),
}

/// State shared by the façade, the consumer threads and the deferred worker.
pub(crate) struct Shared<K, P, I> {
    pub(super) cfg: Config,
    ring: Option<RingBuffer<K, P, I>>,
    registry: Arc<ObserverRegistry<K, P>>,
    pub(super) coalescer: Coalescer<K, P, I>,
    pub(super) metrics: Metrics<K>,
    closed: AtomicBool,
}

impl<K: EventKey, P: Payload, I: Identity> Shared<K, P, I> {
    pub(super) fn new(cfg: Config) -> Self {
        // The deferred worker is a second producer.
        let arity = match cfg.overflow {
            OverflowPolicy::QueueForLater => ProducerArity::Multiple,
            _ => cfg.producer,
        };
        let ring = cfg
            .is_ring_backed()
            .then(|| RingBuffer::new(cfg.capacity_pow2(), arity, cfg.wait));
        let workers = if cfg.is_ring_backed() {
            cfg.consumer_count()
        } else {
            0
        };
        Self {
            metrics: Metrics::new(workers),
            ring,
            registry: Arc::new(ObserverRegistry::new()),
            coalescer: Coalescer::new(),
            closed: AtomicBool::new(false),
            cfg,
        }
    }

    /// Drain loop of consumer thread `index`.
    fn run_worker(&self, index: usize) {
        let Some(ring) = &self.ring else {
            return;
        };
        while let Some(drained) = ring.consume() {
            let Some(taken) = drained.take() else {
                continue;
            };
            self.metrics.worker_drained(index);
            self.dispatch(&taken.key, &taken.payload);
            drop(drained);
            if let Some(id) = taken.coalescing_id {
                self.coalescer.forget(taken.key, id, taken.seq);
            }
        }
    }

    /// Invokes every observer currently registered for `key`, isolating failures.
    fn dispatch(&self, key: &K, payload: &P) {
        let Some(observers) = self.registry.observers(key) else {
            self.drop_no_listener(key);
            return;
        };

        for reg in observers.iter() {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| reg.observer.on_event(payload)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    self.metrics.incr(Counter::ObserverFailure, key);
                    error!(
                        key = ?key,
                        observer = reg.observer.name(),
                        error = %err,
                        "observer failed"
                    );
                }
                Err(panic) => {
                    self.metrics.incr(Counter::ObserverFailure, key);
                    error!(
                        key = ?key,
                        observer = reg.observer.name(),
                        panic = panic_message(&*panic),
                        "observer panicked"
                    );
                }
            }
        }
        self.metrics.incr(Counter::Dispatched, key);
    }

    fn drop_no_listener(&self, key: &K) {
        self.metrics.incr(Counter::DroppedNoListener, key);
        if self.cfg.warn_on_no_listener {
            warn!(key = ?key, "no observer for event; dropped");
        } else {
            trace!(key = ?key, "no observer for event; dropped");
        }
    }

    /// Hands one event to the ring, applying coalescing and `policy` on a full ring.
    fn enqueue(
        &self,
        ring: &RingBuffer<K, P, I>,
        key: K,
        payload: P,
        policy: OverflowPolicy,
    ) -> Result<Admit<K, P>, DispatchError> {
        if let Some(provider) = self.coalescer.provider(&key) {
            return self.enqueue_coalesced(ring, key, provider, payload, policy);
        }
        match ring.try_claim() {
            Some(claim) => {
                claim.publish(key, payload, None);
                Ok(Admit::Done)
            }
            None => self.on_full(ring, key, payload, policy),
        }
    }

    fn enqueue_coalesced(
        &self,
        ring: &RingBuffer<K, P, I>,
        key: K,
        provider: IdProvider<P, I>,
        payload: P,
        policy: OverflowPolicy,
    ) -> Result<Admit<K, P>, DispatchError> {
        let pk = (key, provider(&payload));
        let mut pending = self.coalescer.pending();
        let payload = match replace_pending(ring, &mut pending, &pk, payload) {
            Ok(()) => {
                drop(pending);
                self.metrics.incr(Counter::Coalesced, &pk.0);
                return Ok(Admit::Done);
            }
            Err(payload) => payload,
        };

        let (claim, payload) = match ring.try_claim() {
            Some(claim) => (claim, payload),
            None if policy == OverflowPolicy::WaitUntilAvailable => {
                drop(pending);
                let claim = self.wait_for_slot(ring)?;
                pending = self.coalescer.pending();
                // Another producer may have claimed this identity while we waited.
                match replace_pending(ring, &mut pending, &pk, payload) {
                    Ok(()) => {
                        drop(pending);
                        drop(claim);
                        self.metrics.incr(Counter::Coalesced, &pk.0);
                        return Ok(Admit::Done);
                    }
                    Err(payload) => (claim, payload),
                }
            }
            None => {
                drop(pending);
                return self.on_full(ring, pk.0, payload, policy);
            }
        };

        pending.insert(pk.clone(), claim.seq());
        let (key, id) = pk;
        claim.publish(key, payload, Some(id));
        Ok(Admit::Done)
    }

    fn on_full(
        &self,
        ring: &RingBuffer<K, P, I>,
        key: K,
        payload: P,
        policy: OverflowPolicy,
    ) -> Result<Admit<K, P>, DispatchError> {
        match policy {
            OverflowPolicy::Drop => {
                self.metrics.incr(Counter::DroppedFull, &key);
                debug!(key = ?key, capacity = ring.capacity(), "ring full; event dropped");
                Ok(Admit::Done)
            }
            OverflowPolicy::Throw => {
                self.metrics.incr(Counter::RejectedFull, &key);
                Err(DispatchError::RingFull {
                    capacity: ring.capacity(),
                })
            }
            OverflowPolicy::QueueForLater => {
                self.metrics.incr(Counter::QueuedForLater, &key);
                debug!(key = ?key, "ring full; event queued for later");
                Ok(Admit::Defer(key, payload))
            }
            OverflowPolicy::WaitUntilAvailable => {
                self.wait_for_slot(ring)?.publish(key, payload, None);
                Ok(Admit::Done)
            }
        }
    }

    fn wait_for_slot<'r>(
        &self,
        ring: &'r RingBuffer<K, P, I>,
    ) -> Result<Claim<'r, K, P, I>, DispatchError> {
        let started = Instant::now();
        let claim = ring.claim().ok_or(DispatchError::Closed)?;
        self.metrics.record_wait(started.elapsed());
        Ok(claim)
    }
}

/// Replaces the pending payload for `pk`, or drops a stale entry and hands the payload back.
fn replace_pending<K, P, I>(
    ring: &RingBuffer<K, P, I>,
    pending: &mut Pending<K, I>,
    pk: &(K, I),
    payload: P,
) -> Result<(), P>
where
    K: Eq + std::hash::Hash,
    I: Eq + std::hash::Hash,
{
    let Some(&seq) = pending.get(pk) else {
        return Err(payload);
    };
    ring.replace_pending(seq, &pk.1, payload).inspect_err(|_| {
        pending.remove(pk);
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Event dispatcher with per-key observers.
///
/// - `K`: event key (opaque channel id)
/// - `P`: payload passed to observers by reference
/// - `I`: coalescing identity returned by per-key providers (default `u64`)
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct EventBus<K: EventKey, P: Payload, I: Identity = u64> {
    shared: Arc<Shared<K, P, I>>,
    workers: Mutex<Option<ConsumerPool>>,
    deferred: RwLock<Option<Deferred<(K, P)>>>,
}

impl<K: EventKey, P: Payload, I: Identity> EventBus<K, P, I> {
    /// Builds a bus from `cfg` and starts its threads (ring-backed mode).
    pub fn new(cfg: Config) -> io::Result<Self> {
        Self::builder(cfg).build()
    }

    /// Returns a builder to attach coalescing providers and tracked keys before start.
    pub fn builder(cfg: Config) -> EventBusBuilder<K, P, I> {
        EventBusBuilder::new(cfg)
    }

    /// Spawns the consumer pool and, for `QueueForLater`, the deferred worker.
    pub(super) fn start(shared: Shared<K, P, I>) -> io::Result<Self> {
        let shared = Arc::new(shared);
        let bus = Self {
            shared: Arc::clone(&shared),
            workers: Mutex::new(None),
            deferred: RwLock::new(None),
        };
        let Some(ring) = &shared.ring else {
            return Ok(bus);
        };

        let body: Arc<dyn Fn(usize) + Send + Sync> = {
            let shared = Arc::clone(&shared);
            Arc::new(move |index| shared.run_worker(index))
        };
        let name = format!("{}-worker", shared.cfg.thread_name);
        let pool = ConsumerPool::spawn(&name, shared.cfg.consumer_count(), body)
            .inspect_err(|_| ring.close())?;
        let consumers = pool.len();
        *bus.workers.lock() = Some(pool);

        if shared.cfg.overflow == OverflowPolicy::QueueForLater {
            let sink = {
                let shared = Arc::clone(&shared);
                move |(key, payload): (K, P)| {
                    let Some(ring) = &shared.ring else {
                        return;
                    };
                    if let Err(err) =
                        shared.enqueue(ring, key, payload, OverflowPolicy::WaitUntilAvailable)
                    {
                        debug!(error = %err, "deferred event dropped");
                    }
                }
            };
            let name = format!("{}-deferred", shared.cfg.thread_name);
            // On failure `bus` drops here, which closes the ring and joins the pool.
            *bus.deferred.write() = Some(Deferred::spawn(&name, sink)?);
        }

        debug!(
            capacity = ring.capacity(),
            consumers,
            wait = shared.cfg.wait.as_label(),
            overflow = shared.cfg.overflow.as_label(),
            "event bus started"
        );
        Ok(bus)
    }

    /// Emits `payload` under `key`.
    ///
    /// Never blocks under `Drop`/`Throw`/`QueueForLater`; may block under
    /// `WaitUntilAvailable`. Returns [`DispatchError::RingFull`] only under `Throw`.
    pub fn emit(&self, key: K, payload: P) -> Result<(), DispatchError> {
        let shared = &self.shared;
        if shared.closed.load(Ordering::Acquire) {
            return Err(DispatchError::Closed);
        }
        shared.metrics.incr(Counter::Emitted, &key);

        if !shared.registry.contains(&key) {
            shared.drop_no_listener(&key);
            return Ok(());
        }

        let Some(ring) = &shared.ring else {
            shared.dispatch(&key, &payload);
            return Ok(());
        };

        match shared.enqueue(ring, key, payload, shared.cfg.overflow)? {
            Admit::Done => Ok(()),
            Admit::Defer(key, payload) => {
                let deferred = self.deferred.read();
                let queue = deferred.as_ref().ok_or(DispatchError::Closed)?;
                queue.send((key, payload)).map_err(|_| DispatchError::Closed)
            }
        }
    }

    /// Registers `observer` for `key`.
    pub fn subscribe<O: Observe<P>>(&self, key: K, observer: O) -> Subscription {
        self.subscribe_arc(key, Arc::new(observer))
    }

    /// Registers a shared observer for `key`.
    pub fn subscribe_arc(&self, key: K, observer: ObserverRef<P>) -> Subscription {
        let registry = Arc::downgrade(&self.shared.registry);
        let id = self.shared.registry.subscribe(key.clone(), observer);
        Subscription::new(id, move || {
            if let Some(registry) = registry.upgrade() {
                registry.unsubscribe(&key, id);
            }
        })
    }

    /// Registers an infallible closure for `key`.
    pub fn subscribe_fn<F>(&self, key: K, f: F) -> Subscription
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.subscribe(
            key,
            ObserverFn::new("fn", move |data: &P| -> anyhow::Result<()> {
                f(data);
                Ok(())
            }),
        )
    }

    /// Installs an identity function for `key`; bursts for one identity collapse
    /// into the newest pending payload.
    ///
    /// Has no effect in [`DispatchMode::CurrentThread`](crate::DispatchMode::CurrentThread),
    /// where nothing is ever pending.
    pub fn enable_coalescing<F>(&self, key: K, provider: F)
    where
        F: Fn(&P) -> I + Send + Sync + 'static,
    {
        self.shared.coalescer.enable(key, Arc::new(provider));
    }

    /// Removes the identity function for `key`.
    pub fn disable_coalescing(&self, key: &K) {
        self.shared.coalescer.disable(key);
    }

    /// True if an identity function is installed for `key`.
    pub fn is_coalescing(&self, key: &K) -> bool {
        self.shared.coalescer.is_enabled(key)
    }

    /// Starts per-key counters for `keys`. Totals are always tracked.
    pub fn enable_metrics_tracking(&self, keys: impl IntoIterator<Item = K>) {
        for key in keys {
            self.shared.metrics.track(key);
        }
    }

    /// Stops (and discards) per-key counters for `keys`.
    pub fn disable_metrics_tracking(&self, keys: impl IntoIterator<Item = K>) {
        for key in keys {
            self.shared.metrics.untrack(&key);
        }
    }

    /// Snapshot of the bus totals.
    pub fn metrics(&self) -> MetricsSnapshot {
        let depth = self.shared.ring.as_ref().map_or(0, RingBuffer::depth);
        self.shared.metrics.snapshot(depth)
    }

    /// Per-key counters, if tracking is enabled for `key`.
    pub fn key_metrics(&self, key: &K) -> Option<KeyMetrics> {
        self.shared.metrics.key_metrics(key)
    }

    /// True if at least one observer is registered for `key`.
    pub fn has_subscribers(&self, key: &K) -> bool {
        self.shared.registry.contains(key)
    }

    /// Number of observers registered for `key`.
    pub fn subscriber_count(&self, key: &K) -> usize {
        self.shared.registry.count(key)
    }

    /// Ring capacity after rounding, or `None` in current-thread mode.
    pub fn capacity(&self) -> Option<usize> {
        self.shared.ring.as_ref().map(RingBuffer::capacity)
    }

    /// Configuration the bus was built with.
    pub fn config(&self) -> &Config {
        &self.shared.cfg
    }

    /// True once [`EventBus::shutdown`] was called.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Stops accepting events, drains what was already accepted and joins all threads.
    ///
    /// Order: deferred queue drained into the ring, ring closed, consumers drain the
    /// published slots and exit. Idempotent.
    ///
    /// Must not be called from inside an observer of this bus (a consumer thread
    /// would wait for itself).
    pub fn shutdown(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let deferred = self.deferred.write().take();
        if let Some(deferred) = deferred {
            deferred.shutdown();
        }
        if let Some(ring) = &self.shared.ring {
            ring.close();
        }
        let workers = self.workers.lock().take();
        if let Some(pool) = workers {
            pool.join();
        }
        self.shared.registry.clear();
        debug!("event bus shut down");
    }
}

impl<K: EventKey, P: Payload, I: Identity> Drop for EventBus<K, P, I> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<K: EventKey, P: Payload, I: Identity> std::fmt::Debug for EventBus<K, P, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("mode", &self.shared.cfg.mode)
            .field("capacity", &self.capacity())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
