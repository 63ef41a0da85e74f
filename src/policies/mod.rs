//! Dispatch strategies.
//!
//! This module groups the knobs that control **how** the ring buffer behaves
//! under idleness and under load.
//!
//! ## Contents
//! - [`WaitStrategy`]   how idle consumers (and producers blocked on a full ring) wait
//! - [`OverflowPolicy`] what `emit` does when the ring has no free slot
//! - [`ProducerArity`]  single vs. multiple concurrent producers
//! - [`SleepBackoff`]   how sleep intervals grow for [`WaitStrategy::Sleeping`]
//! - [`JitterPolicy`]   randomization of sleep intervals so a consumer pool does not wake in lockstep
//!
//! ## Quick wiring
//! ```text
//! Config { wait, overflow, producer, .. }
//!      └─► RingBuffer uses:
//!           - producer to pick CAS vs. load/store cursor advance
//!           - wait (through Waiter) in claim()/consume()
//!      └─► EventBus uses:
//!           - overflow when try_claim() reports a full ring
//! ```
//!
//! ## Defaults
//! - `WaitStrategy::Blocking` (lowest CPU).
//! - `OverflowPolicy::Drop` (emit never blocks, never fails on a full ring).
//! - `ProducerArity::Multiple` (always safe).
//! - `SleepBackoff::default()` → spin=100, first=50µs, factor=2.0, max=1ms, jitter=None.

mod backoff;
mod jitter;
mod overflow;
mod producer;
mod wait;

pub use backoff::SleepBackoff;
pub use jitter::JitterPolicy;
pub use overflow::OverflowPolicy;
pub use producer::ProducerArity;
pub use wait::WaitStrategy;

pub(crate) use wait::Waiter;
