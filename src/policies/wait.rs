//! # Wait strategies for idle threads.
//!
//! [`WaitStrategy`] selects how a thread waits for the ring to change state:
//! consumers wait for a published slot, producers under
//! [`OverflowPolicy::WaitUntilAvailable`](crate::OverflowPolicy::WaitUntilAvailable)
//! wait for a released one.
//!
//! | Strategy   | Behavior                                           | Trade-off                   |
//! |------------|----------------------------------------------------|-----------------------------|
//! | `Blocking` | parks on a condition variable, woken by `signal()` | lowest CPU, higher latency  |
//! | `BusySpin` | re-polls in a tight loop                           | lowest latency, high CPU    |
//! | `Sleeping` | spins, yields, then sleeps per [`SleepBackoff`]    | low CPU, moderate latency   |
//! | `Yielding` | spins briefly, then yields every round             | low latency, moderate CPU   |
//!
//! ## Internal scheme
//! ```text
//! Waiter::idle_until(poll):
//!   loop {
//!     ├─ poll() == Some(v) ─► return v
//!     └─ idle one round (per strategy)
//!   }
//!
//! Waiter::signal():
//!   └─ Blocking only: lock + notify_all (other strategies re-poll on their own)
//! ```
//!
//! For `Blocking` the final poll happens under the waiter lock and `signal()` takes
//! the same lock, so a state change made before `signal()` is never missed.

use std::hint;
use std::thread;

use parking_lot::{Condvar, Mutex};

use crate::policies::backoff::SleepBackoff;

/// Busy rounds before a `Yielding` waiter starts yielding.
const YIELD_AFTER_SPINS: u32 = 100;

/// How an idle thread waits for the ring to change state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum WaitStrategy {
    /// Park on a condition variable; producers signal on publish, consumers on release.
    #[default]
    Blocking,

    /// Re-read the sequence in a tight loop.
    BusySpin,

    /// Spin, then yield, then sleep for growing short intervals.
    Sleeping(SleepBackoff),

    /// Spin briefly, then yield the scheduler every round.
    Yielding,
}

impl WaitStrategy {
    /// Shorthand for `Sleeping(SleepBackoff::default())`.
    pub fn sleeping() -> Self {
        WaitStrategy::Sleeping(SleepBackoff::default())
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WaitStrategy::Blocking => "blocking",
            WaitStrategy::BusySpin => "busy_spin",
            WaitStrategy::Sleeping(_) => "sleeping",
            WaitStrategy::Yielding => "yielding",
        }
    }
}

/// Runtime side of a [`WaitStrategy`]: the `{idle, signal}` capability shared by
/// producers and consumers of one ring.
pub(crate) struct Waiter {
    strategy: WaitStrategy,
    lock: Mutex<()>,
    cond: Condvar,
}

impl Waiter {
    pub(crate) fn new(strategy: WaitStrategy) -> Self {
        Self {
            strategy,
            lock: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    /// Idles until `poll` yields a value.
    ///
    /// `poll` must eventually return `Some` once the awaited state change happened
    /// and [`Waiter::signal`] was called after it (this includes shutdown).
    pub(crate) fn idle_until<T>(&self, mut poll: impl FnMut() -> Option<T>) -> T {
        if let Some(v) = poll() {
            return v;
        }
        match self.strategy {
            WaitStrategy::Blocking => {
                let mut guard = self.lock.lock();
                loop {
                    if let Some(v) = poll() {
                        return v;
                    }
                    self.cond.wait(&mut guard);
                }
            }
            WaitStrategy::BusySpin => loop {
                if let Some(v) = poll() {
                    return v;
                }
                hint::spin_loop();
            },
            WaitStrategy::Yielding => {
                let mut round = 0u32;
                loop {
                    if let Some(v) = poll() {
                        return v;
                    }
                    if round < YIELD_AFTER_SPINS {
                        round += 1;
                        hint::spin_loop();
                    } else {
                        thread::yield_now();
                    }
                }
            }
            WaitStrategy::Sleeping(backoff) => {
                let mut round = 0u32;
                loop {
                    if let Some(v) = poll() {
                        return v;
                    }
                    idle_sleeping(&backoff, round);
                    round = round.saturating_add(1);
                }
            }
        }
    }

    /// Wakes every thread parked by this waiter.
    ///
    /// No-op for strategies that re-poll on their own.
    pub(crate) fn signal(&self) {
        if matches!(self.strategy, WaitStrategy::Blocking) {
            let _guard = self.lock.lock();
            self.cond.notify_all();
        }
    }
}

fn idle_sleeping(backoff: &SleepBackoff, round: u32) {
    if round < backoff.spin {
        hint::spin_loop();
    } else if round < backoff.spin.saturating_mul(2) {
        thread::yield_now();
    } else {
        thread::sleep(backoff.next(round - backoff.spin.saturating_mul(2)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn wake_after_delay(strategy: WaitStrategy) {
        let waiter = Arc::new(Waiter::new(strategy));
        let flag = Arc::new(AtomicBool::new(false));

        let setter = {
            let waiter = Arc::clone(&waiter);
            let flag = Arc::clone(&flag);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                flag.store(true, Ordering::Release);
                waiter.signal();
            })
        };

        let got = waiter.idle_until(|| flag.load(Ordering::Acquire).then_some(7));
        assert_eq!(got, 7);
        setter.join().unwrap();
    }

    #[test]
    fn test_blocking_wakes_on_signal() {
        wake_after_delay(WaitStrategy::Blocking);
    }

    #[test]
    fn test_busy_spin_observes_change() {
        wake_after_delay(WaitStrategy::BusySpin);
    }

    #[test]
    fn test_yielding_observes_change() {
        wake_after_delay(WaitStrategy::Yielding);
    }

    #[test]
    fn test_sleeping_observes_change() {
        wake_after_delay(WaitStrategy::sleeping());
    }

    #[test]
    fn test_ready_poll_returns_immediately() {
        let waiter = Waiter::new(WaitStrategy::Blocking);
        assert_eq!(waiter.idle_until(|| Some("now")), "now");
    }
}
