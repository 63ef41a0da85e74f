//! # eventring
//!
//! **eventring** is an in-process event dispatcher for Rust.
//!
//! Producers emit `(key, payload)` pairs; observers subscribe per key. Events go
//! through a preallocated ring buffer drained by a fixed pool of consumer threads,
//! with a configurable wait strategy, overflow policy and producer arity. Bursts
//! can be coalesced per identity, and a backpressure bridge turns a push source
//! into a strictly bounded pull sequence.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   producer 1       producer 2       producer N
//!       │                │                │
//!       └──── emit(key, payload) ─────────┘
//!                        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  EventBus (façade)                                                │
//! │  - ObserverRegistry (key → observers, copy-on-write)              │
//! │  - Coalescer        (key → identity fn, pending (key, id) → seq)  │
//! │  - Metrics          (totals + opt-in per-key counters)            │
//! └───────┬──────────────────────────────┬────────────────────────────┘
//!         │ CurrentThread                │ RingBacked
//!         ▼                              ▼
//!   dispatch in caller      ┌──────────────────────────────┐   ring full
//!                           │ RingBuffer (2^n slots)       │ ─────────────► OverflowPolicy
//!                           │ claim → publish → consume    │                 Drop / Throw /
//!                           │       → release              │                 QueueForLater ─► Deferred
//!                           └──────────────┬───────────────┘                 WaitUntilAvailable
//!                                          ▼
//!                           ConsumerPool (worker 0..N, WaitStrategy)
//!                                          ▼
//!                           observers(key).on_event(&payload)   (isolated per observer)
//! ```
//!
//! ### Lifecycle
//! ```text
//! EventBus::new(cfg) ──► ring + consumer pool (+ deferred worker) started
//!
//! emit ... emit
//!
//! shutdown() / drop
//!   ├─► reject further emits (DispatchError::Closed)
//!   ├─► drain the deferred queue into the ring
//!   ├─► close the ring (waiters woken)
//!   └─► join consumers once every published slot is dispatched
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                              |
//! |-------------------|---------------------------------------------------------------|-------------------------------------------------|
//! | **Dispatcher**    | Per-key subscription façade over the ring buffer.             | [`EventBus`], [`EventBusBuilder`]               |
//! | **Observers**     | Handlers for one key, as trait objects or closures.           | [`Observe`], [`ObserverFn`], [`Subscription`]   |
//! | **Policies**      | Waiting, overflow and producer arity.                         | [`WaitStrategy`], [`OverflowPolicy`], [`ProducerArity`] |
//! | **Metrics**       | Dispatch counters and wait latency.                           | [`MetricsSnapshot`], [`KeyMetrics`]             |
//! | **Bridge**        | Bounded push → pull adapter.                                  | [`Bridge`], [`BridgeStream`]                    |
//! | **Errors**        | Typed errors for emit and push.                               | [`DispatchError`], [`BridgeError`]              |
//! | **Configuration** | Centralized bus settings.                                     | [`Config`], [`DispatchMode`]                    |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogObserver`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use eventring::{Config, EventBus, ObserverFn, OverflowPolicy, WaitStrategy};
//!
//! #[derive(Debug)]
//! struct Quote {
//!     symbol: u32,
//!     price: f64,
//! }
//!
//! let cfg = Config {
//!     capacity: 256,
//!     wait: WaitStrategy::sleeping(),
//!     overflow: OverflowPolicy::WaitUntilAvailable,
//!     consumers: 2,
//!     ..Config::default()
//! };
//!
//! // Latest quote per symbol wins while it is still waiting in the ring.
//! let bus: EventBus<&'static str, Quote> = EventBus::builder(cfg)
//!     .with_coalescing("quote", |q: &Quote| u64::from(q.symbol))
//!     .with_metrics_tracking(["quote"])
//!     .build()?;
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let sub = bus.subscribe(
//!     "quote",
//!     ObserverFn::new("counter", {
//!         let seen = Arc::clone(&seen);
//!         move |q: &Quote| -> anyhow::Result<()> {
//!             anyhow::ensure!(q.price >= 0.0, "negative price {q:?}");
//!             seen.fetch_add(1, Ordering::SeqCst);
//!             Ok(())
//!         }
//!     }),
//! );
//!
//! for i in 0..100 {
//!     bus.emit("quote", Quote { symbol: i % 4, price: f64::from(i) })?;
//! }
//! bus.shutdown();
//!
//! let m = bus.metrics();
//! assert_eq!(m.dispatched + m.coalesced, 100);
//! assert_eq!(seen.load(Ordering::SeqCst) as u64, m.dispatched);
//! sub.cancel();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
mod bridge;
mod core;
mod error;
mod metrics;
mod observers;
mod policies;
mod ring;

// ---- Public re-exports ----

pub use crate::core::{
    Config, DispatchMode, EventBus, EventBusBuilder, EventKey, IdProvider, Identity, Payload,
};
pub use bridge::{Bridge, BridgeStream, CloseAction};
pub use error::{BridgeError, DispatchError};
pub use metrics::{KeyMetrics, MetricsSnapshot};
pub use observers::{Observe, ObserverFn, ObserverRef, Subscription};
pub use policies::{JitterPolicy, OverflowPolicy, ProducerArity, SleepBackoff, WaitStrategy};

// Optional: expose a simple built-in logger observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogObserver;
