//! # Observer registry - key → copy-on-write observer list.
//!
//! ## Architecture
//! ```text
//! DashMap<K, Arc<[Registered<P>]>>
//!   subscribe(k, o)    → replace list with old + o      (shard write lock, O(n) copy)
//!   unsubscribe(k, id) → replace list with old - id     (remove key when empty)
//!   observers(k)       → Arc clone of the current list  (shard read lock, O(1))
//! ```
//!
//! ## Rules
//! - A key with zero observers is absent from the map.
//! - Readers iterate a snapshot; concurrent subscribe/unsubscribe never mutate a
//!   list that is being dispatched.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::observers::ObserverRef;

/// One registration.
pub(crate) struct Registered<P> {
    pub(crate) id: u64,
    pub(crate) observer: ObserverRef<P>,
}

impl<P> Clone for Registered<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            observer: Arc::clone(&self.observer),
        }
    }
}

/// Snapshot of the observers of one key.
pub(crate) type Observers<P> = Arc<[Registered<P>]>;

/// Concurrent key → observer-list map.
pub(crate) struct ObserverRegistry<K, P> {
    map: DashMap<K, Observers<P>>,
    next_id: AtomicU64,
}

impl<K: Eq + Hash + Clone, P> ObserverRegistry<K, P> {
    pub(crate) fn new() -> Self {
        Self {
            map: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers `observer` under `key` and returns its registration id.
    pub(crate) fn subscribe(&self, key: K, observer: ObserverRef<P>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let reg = Registered { id, observer };
        match self.map.entry(key) {
            Entry::Occupied(mut e) => {
                let list: Observers<P> = e.get().iter().cloned().chain([reg]).collect();
                e.insert(list);
            }
            Entry::Vacant(e) => {
                e.insert(Arc::from(vec![reg]));
            }
        }
        id
    }

    /// Removes registration `id` from `key`. Returns `false` if it was not there.
    pub(crate) fn unsubscribe(&self, key: &K, id: u64) -> bool {
        let Entry::Occupied(mut e) = self.map.entry(key.clone()) else {
            return false;
        };
        if !e.get().iter().any(|r| r.id == id) {
            return false;
        }
        let list: Observers<P> = e.get().iter().filter(|r| r.id != id).cloned().collect();
        if list.is_empty() {
            e.remove();
        } else {
            e.insert(list);
        }
        true
    }

    /// Current observers of `key`, or `None` if there are none.
    pub(crate) fn observers(&self, key: &K) -> Option<Observers<P>> {
        self.map.get(key).map(|e| Arc::clone(e.value()))
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub(crate) fn count(&self, key: &K) -> usize {
        self.map.get(key).map_or(0, |e| e.len())
    }

    pub(crate) fn clear(&self) {
        self.map.clear();
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observers::ObserverFn;

    fn noop() -> ObserverRef<u32> {
        ObserverFn::arc("noop", |_: &u32| Ok(()))
    }

    #[test]
    fn test_key_created_and_removed_lazily() {
        let reg: ObserverRegistry<&str, u32> = ObserverRegistry::new();
        assert!(!reg.contains(&"a"));

        let id1 = reg.subscribe("a", noop());
        let id2 = reg.subscribe("a", noop());
        assert_ne!(id1, id2);
        assert_eq!(reg.count(&"a"), 2);

        assert!(reg.unsubscribe(&"a", id1));
        assert_eq!(reg.count(&"a"), 1);
        assert!(reg.unsubscribe(&"a", id2));
        assert!(!reg.contains(&"a"));
        assert_eq!(reg.keys(), 0);
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let reg: ObserverRegistry<&str, u32> = ObserverRegistry::new();
        let id = reg.subscribe("a", noop());
        assert!(!reg.unsubscribe(&"a", id + 100));
        assert!(!reg.unsubscribe(&"b", id));
        assert_eq!(reg.count(&"a"), 1);
    }

    #[test]
    fn test_snapshot_survives_concurrent_change() {
        let reg: ObserverRegistry<&str, u32> = ObserverRegistry::new();
        let id = reg.subscribe("a", noop());
        let snapshot = reg.observers(&"a").unwrap();
        reg.unsubscribe(&"a", id);
        reg.subscribe("a", noop());
        reg.subscribe("a", noop());

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert_eq!(reg.observers(&"a").unwrap().len(), 2);
    }
}
