//! Preallocated ring buffer and the threads that drain it.
//!
//! ## Contents
//! - `slot`     the reusable arena element (key, payload, coalescing id)
//! - `buffer`   [`RingBuffer`] and the claim/publish/consume/release protocol
//! - `workers`  fixed pool of consumer threads
//! - `deferred` unbounded secondary worker used by `OverflowPolicy::QueueForLater`
//!
//! ## Slot lifecycle
//! ```text
//!   free ──try_claim()/claim()──► claimed ──publish()──► published
//!     ▲                                                     │
//!     │                                              consume() (exactly one worker)
//!     │                                                     ▼
//!     └──────────────── release() (reset) ◄──────────── drained
//! ```

mod buffer;
mod deferred;
mod slot;
mod workers;

pub(crate) use buffer::{Claim, RingBuffer};
pub(crate) use deferred::Deferred;
pub(crate) use workers::ConsumerPool;
