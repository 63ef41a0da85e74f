//! # Coalescing registry - latest-value-wins per identity.
//!
//! A key with coalescing enabled carries an identity function `&P -> I`. While a
//! slot for `(key, identity)` is published but not yet drained, a new emit for the
//! same identity replaces that slot's payload instead of claiming another slot.
//!
//! ## Scheme
//! ```text
//! emit(k, p) with provider f:
//!   id = f(&p)
//!   lock(pending)
//!     ├─ pending[(k, id)] = seq and slot(seq) still holds id → replace payload, coalesced++
//!     ├─ stale entry (slot drained or reused)                → remove, fall through
//!     └─ claim slot → pending[(k, id)] = seq → publish
//!   unlock
//!
//! consumer after release:
//!   lock(pending) → remove (k, id) only if it still maps to the drained seq
//! ```
//!
//! ## Rules
//! - At most one pending slot per `(key, identity)`.
//! - Replacement and claim happen under the same lock, so a replace can never be
//!   lost to a concurrent claim for the same identity.
//! - The lock is never held while blocking for ring space.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};

/// Identity function installed per key.
pub type IdProvider<P, I> = Arc<dyn Fn(&P) -> I + Send + Sync>;

/// Pending `(key, identity) → sequence` map.
pub(crate) type Pending<K, I> = HashMap<(K, I), u64>;

/// Per-key identity providers plus the pending map.
pub(crate) struct Coalescer<K, P, I> {
    providers: DashMap<K, IdProvider<P, I>>,
    pending: Mutex<Pending<K, I>>,
}

impl<K, P, I> Coalescer<K, P, I>
where
    K: Eq + Hash + Clone,
    I: Eq + Hash,
{
    pub(crate) fn new() -> Self {
        Self {
            providers: DashMap::new(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn enable(&self, key: K, provider: IdProvider<P, I>) {
        self.providers.insert(key, provider);
    }

    /// Removes the provider; slots already pending for `key` are drained normally.
    pub(crate) fn disable(&self, key: &K) {
        if self.providers.remove(key).is_some() {
            self.pending.lock().retain(|(k, _), _| k != key);
        }
    }

    pub(crate) fn provider(&self, key: &K) -> Option<IdProvider<P, I>> {
        self.providers.get(key).map(|p| Arc::clone(p.value()))
    }

    pub(crate) fn is_enabled(&self, key: &K) -> bool {
        self.providers.contains_key(key)
    }

    pub(crate) fn pending(&self) -> MutexGuard<'_, Pending<K, I>> {
        self.pending.lock()
    }

    /// Drops the entry for `(key, id)` if it still points at `seq`.
    pub(crate) fn forget(&self, key: K, id: I, seq: u64) {
        let mut pending = self.pending.lock();
        let pk = (key, id);
        if pending.get(&pk) == Some(&seq) {
            pending.remove(&pk);
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coalescer() -> Coalescer<&'static str, (u32, u32), u32> {
        Coalescer::new()
    }

    #[test]
    fn test_provider_lifecycle() {
        let c = coalescer();
        assert!(c.provider(&"k").is_none());

        c.enable("k", Arc::new(|p: &(u32, u32)| p.0));
        let f = c.provider(&"k").expect("installed");
        assert_eq!(f(&(7, 1)), 7);
        assert!(c.is_enabled(&"k"));

        c.disable(&"k");
        assert!(!c.is_enabled(&"k"));
    }

    #[test]
    fn test_forget_only_matching_sequence() {
        let c = coalescer();
        c.pending().insert(("k", 1), 10);

        c.forget("k", 1, 9);
        assert_eq!(c.pending_len(), 1);
        c.forget("k", 1, 10);
        assert_eq!(c.pending_len(), 0);
    }

    #[test]
    fn test_disable_clears_pending_for_key_only() {
        let c = coalescer();
        c.enable("a", Arc::new(|p: &(u32, u32)| p.0));
        c.enable("b", Arc::new(|p: &(u32, u32)| p.0));
        c.pending().insert(("a", 1), 1);
        c.pending().insert(("b", 1), 2);

        c.disable(&"a");
        assert_eq!(c.pending_len(), 1);
        assert_eq!(c.pending().get(&("b", 1)), Some(&2));
    }
}
