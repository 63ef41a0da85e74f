//! # Overflow policies for a full ring buffer.
//!
//! [`OverflowPolicy`] decides what [`EventBus::emit`](crate::EventBus::emit) does when
//! no slot can be claimed without overtaking the slowest unreleased slot.
//!
//! | Policy                 | Caller                     | Event                                  |
//! |------------------------|----------------------------|----------------------------------------|
//! | `Drop`                 | returns `Ok(())`           | discarded, `dropped_full` metric       |
//! | `Throw`                | gets `RingFull`            | discarded, `rejected_full` metric      |
//! | `QueueForLater`        | returns `Ok(())`           | retried by a secondary worker thread   |
//! | `WaitUntilAvailable`   | blocks until a slot frees  | dispatched, wait latency recorded      |
//!
//! ## Ordering
//! `QueueForLater` events are claimed by the secondary worker whenever space frees;
//! they carry **no** ordering guarantee relative to events claimed directly by
//! producers in the meantime.

/// Policy applied by a producer when the ring buffer is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Discard the event and count it; no error is raised.
    #[default]
    Drop,

    /// Return [`DispatchError::RingFull`](crate::DispatchError::RingFull) to the caller.
    Throw,

    /// Hand the event to an unbounded secondary worker that blocks on `claim()`.
    ///
    /// The producer returns immediately; the event is eventually dispatched.
    QueueForLater,

    /// Block the calling thread until a slot is claimed.
    WaitUntilAvailable,
}

impl OverflowPolicy {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            OverflowPolicy::Drop => "drop",
            OverflowPolicy::Throw => "throw",
            OverflowPolicy::QueueForLater => "queue_for_later",
            OverflowPolicy::WaitUntilAvailable => "wait_until_available",
        }
    }
}
