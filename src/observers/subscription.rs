//! # Subscription handle.
//!
//! [`Subscription`] is returned by [`EventBus::subscribe`](crate::EventBus::subscribe).
//! Cancelling it removes the observer from its key.
//!
//! ## Rules
//! - `cancel()` is idempotent.
//! - Cancelling stops **future** dispatch only: a slot already claimed for the key is
//!   delivered to whichever observers are registered when it is drained.
//! - Dropping the handle does **not** cancel; the observer stays registered until
//!   the bus is dropped.
//! - A handle outliving its bus cancels as a no-op.

use std::fmt;

use parking_lot::Mutex;

type CancelFn = Box<dyn FnOnce() + Send>;

/// Handle to one `(key, observer)` registration.
pub struct Subscription {
    id: u64,
    cancel: Mutex<Option<CancelFn>>,
}

impl Subscription {
    pub(crate) fn new(id: u64, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Registration id, unique per bus.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Removes the observer from its key. Later calls do nothing.
    pub fn cancel(&self) {
        let cancel = self.cancel.lock().take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// True until [`Subscription::cancel`] is called.
    pub fn is_active(&self) -> bool {
        self.cancel.lock().is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cancel_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sub = {
            let calls = Arc::clone(&calls);
            Subscription::new(3, move || {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        assert!(sub.is_active());
        sub.cancel();
        sub.cancel();
        assert!(!sub.is_active());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sub.id(), 3);
    }
}
