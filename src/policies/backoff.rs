//! # Sleep backoff for idle waits.
//!
//! [`SleepBackoff`] parameterizes [`WaitStrategy::Sleeping`](crate::WaitStrategy::Sleeping):
//! - [`SleepBackoff::spin`] rounds spent busy-spinning, then the same number yielding;
//! - [`SleepBackoff::first`] the first sleep interval;
//! - [`SleepBackoff::factor`] the multiplicative growth factor;
//! - [`SleepBackoff::max`] the interval cap.
//!
//! The interval for sleep round `n` is `first × factor^n`, clamped to `max`, then
//! jitter is applied. The base is derived from the round number only, so jitter
//! never feeds back into later intervals.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use eventring::{JitterPolicy, SleepBackoff};
//!
//! let backoff = SleepBackoff {
//!     spin: 10,
//!     first: Duration::from_micros(100),
//!     max: Duration::from_millis(1),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_micros(100));
//! assert_eq!(backoff.next(1), Duration::from_micros(200));
//! assert_eq!(backoff.next(10), Duration::from_millis(1));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Sleep schedule for idle waits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SleepBackoff {
    /// Rounds spent spinning before yielding, and yielding before sleeping.
    pub spin: u32,
    /// First sleep interval.
    pub first: Duration,
    /// Sleep interval cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter applied to every interval.
    pub jitter: JitterPolicy,
}

impl Default for SleepBackoff {
    /// Returns a schedule with:
    /// - `spin = 100`;
    /// - `first = 50µs`;
    /// - `factor = 2.0`;
    /// - `max = 1ms`.
    fn default() -> Self {
        Self {
            spin: 100,
            first: Duration::from_micros(50),
            max: Duration::from_millis(1),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl SleepBackoff {
    /// Computes the sleep interval for the given sleep round (0-indexed).
    ///
    /// Non-finite or out-of-range growth is clamped to [`SleepBackoff::max`].
    pub fn next(&self, round: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = round.min(i32::MAX as u32) as i32;
        let unclamped = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !unclamped.is_finite() || unclamped < 0.0 || unclamped > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(unclamped)
        };
        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(first_us: u64, max_us: u64, factor: f64) -> SleepBackoff {
        SleepBackoff {
            spin: 0,
            first: Duration::from_micros(first_us),
            max: Duration::from_micros(max_us),
            factor,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn test_round_zero_returns_first() {
        assert_eq!(plain(50, 1000, 2.0).next(0), Duration::from_micros(50));
    }

    #[test]
    fn test_exponential_growth() {
        let b = plain(50, 10_000, 2.0);
        assert_eq!(b.next(1), Duration::from_micros(100));
        assert_eq!(b.next(2), Duration::from_micros(200));
        assert_eq!(b.next(3), Duration::from_micros(400));
    }

    #[test]
    fn test_constant_factor() {
        let b = plain(300, 10_000, 1.0);
        for round in 0..10 {
            assert_eq!(b.next(round), Duration::from_micros(300));
        }
    }

    #[test]
    fn test_first_exceeds_max() {
        assert_eq!(plain(5000, 1000, 2.0).next(0), Duration::from_micros(1000));
    }

    #[test]
    fn test_huge_round_clamps_to_max() {
        let b = plain(50, 1000, 2.0);
        assert_eq!(b.next(200), Duration::from_micros(1000));
        assert_eq!(b.next(u32::MAX), Duration::from_micros(1000));
    }

    #[test]
    fn test_jitter_stays_under_base() {
        let b = SleepBackoff {
            jitter: JitterPolicy::Full,
            ..plain(50, 1000, 2.0)
        };
        for round in 0..20 {
            assert!(b.next(round) <= Duration::from_micros(1000));
        }
    }
}
