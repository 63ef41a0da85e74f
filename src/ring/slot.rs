//! # Slot: reusable arena element.
//!
//! One [`Slot`] exists per ring position. It is allocated once when the ring is
//! built and reused for the lifetime of the dispatcher.
//!
//! ## Rules
//! - `seq` is the sequence of the claim that last filled the slot.
//! - A slot holds an event while `payload` is `Some`; `take()` empties it.
//! - `reset()` clears key, payload and coalescing id before the slot is freed.

/// Reusable arena element.
pub(crate) struct Slot<K, P, I> {
    pub(super) seq: u64,
    pub(super) key: Option<K>,
    pub(super) payload: Option<P>,
    pub(super) coalescing_id: Option<I>,
}

/// Event moved out of a slot by the consumer that drained it.
pub(crate) struct Taken<K, P, I> {
    pub(crate) seq: u64,
    pub(crate) key: K,
    pub(crate) payload: P,
    pub(crate) coalescing_id: Option<I>,
}

impl<K, P, I> Slot<K, P, I> {
    pub(super) fn empty() -> Self {
        Self {
            seq: 0,
            key: None,
            payload: None,
            coalescing_id: None,
        }
    }

    pub(super) fn fill(&mut self, seq: u64, key: K, payload: P, coalescing_id: Option<I>) {
        self.seq = seq;
        self.key = Some(key);
        self.payload = Some(payload);
        self.coalescing_id = coalescing_id;
    }

    /// Moves the event out, leaving the slot empty.
    pub(super) fn take(&mut self) -> Option<Taken<K, P, I>> {
        let key = self.key.take()?;
        let payload = self.payload.take()?;
        Some(Taken {
            seq: self.seq,
            key,
            payload,
            coalescing_id: self.coalescing_id.take(),
        })
    }

    pub(super) fn reset(&mut self) {
        self.key = None;
        self.payload = None;
        self.coalescing_id = None;
    }

    pub(super) fn is_pending(&self, seq: u64) -> bool {
        self.seq == seq && self.payload.is_some()
    }
}
