//! # Bus configuration.
//!
//! Provides [`Config`], the settings an [`EventBus`](crate::EventBus) is built with.
//! The configuration is read once at construction and is immutable afterwards.
//!
//! ## Clamping rules
//! - `capacity` is rounded up to the next power of two (`0` → `1`), capped at
//!   [`Config::MAX_CAPACITY`].
//! - `consumers = 0` is treated as `1`.
//! - Ring settings (`capacity`, `wait`, `overflow`, `producer`, `consumers`) are
//!   ignored in [`DispatchMode::CurrentThread`].

use crate::policies::{OverflowPolicy, ProducerArity, WaitStrategy};

/// Where observers run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// The emitting thread invokes every observer in turn before `emit` returns.
    ///
    /// No ring, no threads: strict ordering with the caller, minimal latency,
    /// no isolation from slow observers.
    CurrentThread,

    /// Events go through the ring buffer and are fanned out by the consumer pool.
    #[default]
    RingBacked,
}

/// Configuration for one event bus.
///
/// ## Field semantics
/// - `capacity`: ring slots (rounded up to a power of two)
/// - `wait`: how idle consumers and blocked producers wait
/// - `overflow`: what `emit` does on a full ring
/// - `producer`: single vs. multiple producer threads (see [`ProducerArity`] precondition)
/// - `consumers`: consumer threads (`0` = `1`)
/// - `mode`: current-thread or ring-backed dispatch
/// - `warn_on_no_listener`: log a warning when an event is dropped for lack of observers
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of ring slots; rounded up to the next power of two.
    pub capacity: usize,

    /// Wait strategy shared by consumers and blocked producers.
    pub wait: WaitStrategy,

    /// Overflow policy applied when the ring is full.
    pub overflow: OverflowPolicy,

    /// Producer arity.
    ///
    /// `Single` is a correctness precondition: only one thread may ever emit.
    pub producer: ProducerArity,

    /// Size of the consumer thread pool.
    pub consumers: usize,

    /// Dispatch mode.
    pub mode: DispatchMode,

    /// Emit a `WARN` log for events dropped because no observer exists.
    ///
    /// When `false` the drop is still counted and logged at `TRACE`.
    pub warn_on_no_listener: bool,

    /// Prefix for consumer/deferred thread names.
    pub thread_name: String,
}

impl Config {
    /// Largest ring the bus will allocate (2^30 slots).
    pub const MAX_CAPACITY: usize = 1 << 30;

    /// Returns the ring capacity rounded up to the next power of two, in `1..=MAX_CAPACITY`.
    #[inline]
    pub fn capacity_pow2(&self) -> usize {
        self.capacity
            .clamp(1, Self::MAX_CAPACITY)
            .checked_next_power_of_two()
            .unwrap_or(Self::MAX_CAPACITY)
    }

    /// Returns the consumer pool size clamped to a minimum of 1.
    #[inline]
    pub fn consumer_count(&self) -> usize {
        self.consumers.max(1)
    }

    /// Returns `true` if events go through the ring buffer.
    #[inline]
    pub fn is_ring_backed(&self) -> bool {
        matches!(self.mode, DispatchMode::RingBacked)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `capacity = 1024`
    /// - `wait = WaitStrategy::Blocking`
    /// - `overflow = OverflowPolicy::Drop`
    /// - `producer = ProducerArity::Multiple`
    /// - `consumers = 1`
    /// - `mode = DispatchMode::RingBacked`
    /// - `warn_on_no_listener = true`
    fn default() -> Self {
        Self {
            capacity: 1024,
            wait: WaitStrategy::default(),
            overflow: OverflowPolicy::default(),
            producer: ProducerArity::default(),
            consumers: 1,
            mode: DispatchMode::default(),
            warn_on_no_listener: true,
            thread_name: "eventring".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_rounds_up_to_power_of_two() {
        let mut cfg = Config::default();
        for (given, expected) in [(0, 1), (1, 1), (3, 4), (4, 4), (5, 8), (1000, 1024)] {
            cfg.capacity = given;
            assert_eq!(cfg.capacity_pow2(), expected, "capacity {given}");
        }
    }

    #[test]
    fn test_huge_capacity_is_capped() {
        let mut cfg = Config::default();
        for given in [Config::MAX_CAPACITY + 1, usize::MAX / 2 + 2, usize::MAX] {
            cfg.capacity = given;
            assert_eq!(cfg.capacity_pow2(), Config::MAX_CAPACITY, "capacity {given}");
        }
    }

    #[test]
    fn test_consumers_clamped() {
        let cfg = Config {
            consumers: 0,
            ..Config::default()
        };
        assert_eq!(cfg.consumer_count(), 1);
    }
}
