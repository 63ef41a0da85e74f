//! # RingBuffer: fixed-capacity slot arena with sequence stamps.
//!
//! Each cell carries a sequence **stamp** next to its [`Slot`]. The stamp encodes the
//! phase of the cell relative to the write and read cursors:
//!
//! ```text
//! stamp == pos            free for the producer claiming sequence `pos`
//! stamp == pos + 1        published; drainable by the consumer reading `pos`
//! stamp == pos + capacity released; free for sequence `pos + capacity`
//! ```
//!
//! ## Rules
//! - **Claim**: the write cursor is advanced only when the target cell's stamp equals the
//!   cursor; a smaller stamp means the slowest slot is still in use (ring full).
//! - **Publish**: release-store of `seq + 1`; every write to the slot before it is
//!   visible to the consumer that acquires the stamp.
//! - **Consume**: the read cursor is advanced with CAS, so each published slot goes to
//!   exactly one consumer of the pool.
//! - **Release**: the slot is reset and its stamp moved to `seq + capacity`.
//!
//! A [`Claim`] dropped without `publish` publishes an empty slot, which consumers
//! release without dispatching, so an abandoned claim never wedges the ring.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use super::slot::{Slot, Taken};
use crate::policies::{ProducerArity, WaitStrategy, Waiter};

/// Cursor padded to its own cache line pair.
#[repr(align(128))]
struct Cursor(AtomicU64);

impl Deref for Cursor {
    type Target = AtomicU64;

    fn deref(&self) -> &AtomicU64 {
        &self.0
    }
}

struct Cell<K, P, I> {
    stamp: AtomicU64,
    slot: Mutex<Slot<K, P, I>>,
}

/// Fixed-capacity (power-of-two) ring of reusable slots.
pub(crate) struct RingBuffer<K, P, I> {
    cells: Box<[Cell<K, P, I>]>,
    mask: u64,
    write: Cursor,
    read: Cursor,
    arity: ProducerArity,
    waiter: Waiter,
    closed: AtomicBool,
}

impl<K, P, I> RingBuffer<K, P, I> {
    /// Builds the arena. `capacity` must be a power of two (callers round it up).
    pub(crate) fn new(capacity: usize, arity: ProducerArity, wait: WaitStrategy) -> Self {
        debug_assert!(capacity.is_power_of_two());
        let cells = (0..capacity as u64)
            .map(|i| Cell {
                stamp: AtomicU64::new(i),
                slot: Mutex::new(Slot::empty()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            cells,
            mask: capacity as u64 - 1,
            write: Cursor(AtomicU64::new(0)),
            read: Cursor(AtomicU64::new(0)),
            arity,
            waiter: Waiter::new(wait),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Claimed-but-not-drained slots (approximate under concurrency).
    pub(crate) fn depth(&self) -> usize {
        let w = self.write.load(Ordering::Relaxed);
        let r = self.read.load(Ordering::Relaxed);
        w.saturating_sub(r) as usize
    }

    #[inline]
    fn cell(&self, seq: u64) -> &Cell<K, P, I> {
        &self.cells[(seq & self.mask) as usize]
    }

    /// Reserves the next sequence, or `None` if the ring is full.
    pub(crate) fn try_claim(&self) -> Option<Claim<'_, K, P, I>> {
        let mut pos = self.write.load(Ordering::Relaxed);
        loop {
            let stamp = self.cell(pos).stamp.load(Ordering::Acquire);
            let diff = stamp.wrapping_sub(pos) as i64;
            if diff == 0 {
                match self.arity {
                    ProducerArity::Single => {
                        self.write.store(pos + 1, Ordering::Relaxed);
                        return Some(Claim::new(self, pos));
                    }
                    ProducerArity::Multiple => {
                        match self.write.compare_exchange_weak(
                            pos,
                            pos + 1,
                            Ordering::Relaxed,
                            Ordering::Relaxed,
                        ) {
                            Ok(_) => return Some(Claim::new(self, pos)),
                            Err(current) => pos = current,
                        }
                    }
                }
            } else if diff < 0 {
                return None;
            } else {
                pos = self.write.load(Ordering::Relaxed);
            }
        }
    }

    /// Reserves the next sequence, idling per the wait strategy while the ring is full.
    ///
    /// Returns `None` once the ring is closed.
    pub(crate) fn claim(&self) -> Option<Claim<'_, K, P, I>> {
        self.waiter.idle_until(|| {
            if self.is_closed() {
                return Some(None);
            }
            self.try_claim().map(Some)
        })
    }

    /// Takes ownership of the next published slot, or `None` if nothing is published.
    pub(crate) fn try_consume(&self) -> Option<Drained<'_, K, P, I>> {
        let mut pos = self.read.load(Ordering::Relaxed);
        loop {
            let stamp = self.cell(pos).stamp.load(Ordering::Acquire);
            let diff = stamp.wrapping_sub(pos.wrapping_add(1)) as i64;
            if diff == 0 {
                match self.read.compare_exchange_weak(
                    pos,
                    pos + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return Some(Drained { ring: self, seq: pos }),
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                return None;
            } else {
                pos = self.read.load(Ordering::Relaxed);
            }
        }
    }

    /// Waits for the next published slot.
    ///
    /// Returns `None` once the ring is closed **and** nothing published is left.
    pub(crate) fn consume(&self) -> Option<Drained<'_, K, P, I>> {
        self.waiter.idle_until(|| match self.try_consume() {
            Some(drained) => Some(Some(drained)),
            None if self.is_closed() => Some(None),
            None => None,
        })
    }

    /// Replaces the payload of slot `seq` if it is still pending for `id`.
    ///
    /// Hands the payload back when the slot was already drained or reused.
    pub(crate) fn replace_pending(&self, seq: u64, id: &I, payload: P) -> Result<(), P>
    where
        I: PartialEq,
    {
        let mut slot = self.cell(seq).slot.lock();
        if slot.is_pending(seq) && slot.coalescing_id.as_ref() == Some(id) {
            slot.payload = Some(payload);
            Ok(())
        } else {
            Err(payload)
        }
    }

    /// Stops accepting claims and wakes every waiter. Published slots remain drainable.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.waiter.signal();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn release(&self, seq: u64) {
        let cell = self.cell(seq);
        cell.slot.lock().reset();
        cell.stamp
            .store(seq.wrapping_add(self.mask + 1), Ordering::Release);
        self.waiter.signal();
    }
}

/// Reserved sequence owned by one producer until it is published.
pub(crate) struct Claim<'a, K, P, I> {
    ring: &'a RingBuffer<K, P, I>,
    seq: u64,
    published: bool,
}

impl<'a, K, P, I> Claim<'a, K, P, I> {
    fn new(ring: &'a RingBuffer<K, P, I>, seq: u64) -> Self {
        Self {
            ring,
            seq,
            published: false,
        }
    }

    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    /// Fills the slot and makes it visible to consumers.
    pub(crate) fn publish(mut self, key: K, payload: P, coalescing_id: Option<I>) {
        self.ring
            .cell(self.seq)
            .slot
            .lock()
            .fill(self.seq, key, payload, coalescing_id);
        self.commit();
    }

    fn commit(&mut self) {
        self.published = true;
        self.ring
            .cell(self.seq)
            .stamp
            .store(self.seq.wrapping_add(1), Ordering::Release);
        self.ring.waiter.signal();
    }
}

impl<K, P, I> Drop for Claim<'_, K, P, I> {
    fn drop(&mut self) {
        if !self.published {
            {
                let mut slot = self.ring.cell(self.seq).slot.lock();
                slot.reset();
                slot.seq = self.seq;
            }
            self.commit();
        }
    }
}

/// Published slot owned by exactly one consumer; released on drop.
pub(crate) struct Drained<'a, K, P, I> {
    ring: &'a RingBuffer<K, P, I>,
    seq: u64,
}

impl<K, P, I> Drained<'_, K, P, I> {
    /// Moves the event out of the slot. `None` for an abandoned (empty) claim.
    pub(crate) fn take(&self) -> Option<Taken<K, P, I>> {
        self.ring.cell(self.seq).slot.lock().take()
    }
}

impl<K, P, I> Drop for Drained<'_, K, P, I> {
    fn drop(&mut self) {
        self.ring.release(self.seq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    type Ring = RingBuffer<&'static str, u32, u32>;

    fn ring(capacity: usize) -> Ring {
        RingBuffer::new(capacity, ProducerArity::Multiple, WaitStrategy::Blocking)
    }

    #[test]
    fn test_claim_until_full() {
        let r = ring(4);
        for i in 0..4 {
            r.try_claim().expect("free slot").publish("k", i, None);
        }
        assert!(r.try_claim().is_none());
        assert_eq!(r.depth(), 4);
    }

    #[test]
    fn test_release_frees_capacity() {
        let r = ring(2);
        r.try_claim().unwrap().publish("k", 1, None);
        r.try_claim().unwrap().publish("k", 2, None);
        assert!(r.try_claim().is_none());

        let d = r.try_consume().unwrap();
        assert_eq!(d.take().unwrap().payload, 1);
        assert!(r.try_claim().is_none(), "slot is not free until released");
        drop(d);
        assert!(r.try_claim().is_some());
    }

    #[test]
    fn test_unpublished_claim_is_not_consumable() {
        let r = ring(4);
        let c = r.try_claim().unwrap();
        assert!(r.try_consume().is_none());
        c.publish("k", 9, None);
        let d = r.try_consume().unwrap();
        let taken = d.take().unwrap();
        assert_eq!((taken.key, taken.payload, taken.seq), ("k", 9, 0));
    }

    #[test]
    fn test_abandoned_claim_publishes_empty_slot() {
        let r = ring(2);
        drop(r.try_claim().unwrap());
        let d = r.try_consume().expect("empty slot is still drained");
        assert!(d.take().is_none());
        drop(d);
        assert_eq!(r.depth(), 0);
    }

    #[test]
    fn test_slots_are_reset_on_release() {
        let r = ring(1);
        r.try_claim().unwrap().publish("k", 1, Some(5));
        drop(r.try_consume().unwrap());
        let slot = r.cells[0].slot.lock();
        assert!(slot.key.is_none() && slot.payload.is_none() && slot.coalescing_id.is_none());
    }

    #[test]
    fn test_replace_pending_only_before_take() {
        let r = ring(4);
        let c = r.try_claim().unwrap();
        let seq = c.seq();
        c.publish("k", 1, Some(42));

        assert!(r.replace_pending(seq, &42, 2).is_ok());
        assert_eq!(r.replace_pending(seq, &7, 3), Err(3), "identity mismatch");

        let d = r.try_consume().unwrap();
        assert_eq!(d.take().unwrap().payload, 2);
        assert_eq!(r.replace_pending(seq, &42, 4), Err(4), "already drained");
    }

    #[test]
    fn test_single_producer_wraps_around() {
        let r: Ring = RingBuffer::new(2, ProducerArity::Single, WaitStrategy::BusySpin);
        for i in 0..10 {
            r.try_claim().unwrap().publish("k", i, None);
            let d = r.try_consume().unwrap();
            assert_eq!(d.take().unwrap().payload, i);
        }
    }

    #[test]
    fn test_consume_returns_none_after_close_and_drain() {
        let r = ring(4);
        r.try_claim().unwrap().publish("k", 1, None);
        r.close();
        assert!(r.claim().is_none());
        assert!(r.consume().is_some());
        assert!(r.consume().is_none());
    }

    #[test]
    fn test_blocking_claim_waits_for_release() {
        let r = Arc::new(ring(1));
        r.try_claim().unwrap().publish("k", 1, None);

        let producer = {
            let r = Arc::clone(&r);
            thread::spawn(move || {
                r.claim().expect("open ring").publish("k", 2, None);
            })
        };

        thread::sleep(std::time::Duration::from_millis(20));
        let d = r.consume().unwrap();
        assert_eq!(d.take().unwrap().payload, 1);
        drop(d);
        producer.join().unwrap();
        assert_eq!(r.consume().unwrap().take().unwrap().payload, 2);
    }

    #[test]
    fn test_multi_producer_multi_consumer_delivers_each_once() {
        const PER_PRODUCER: u32 = 2_000;
        let r = Arc::new(ring(64));

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let r = Arc::clone(&r);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        r.claim().unwrap().publish("k", p * PER_PRODUCER + i, None);
                    }
                })
            })
            .collect();

        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let r = Arc::clone(&r);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(d) = r.consume() {
                        if let Some(t) = d.take() {
                            seen.push(t.payload);
                        }
                    }
                    seen
                })
            })
            .collect();

        for p in producers {
            p.join().unwrap();
        }
        r.close();

        let mut all: Vec<u32> = consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..4 * PER_PRODUCER).collect::<Vec<_>>());
    }
}
