//! # Jitter policy for sleep intervals.
//!
//! [`JitterPolicy`] adds randomness to the sleep intervals of
//! [`WaitStrategy::Sleeping`](crate::WaitStrategy::Sleeping) so that a pool of idle
//! consumers does not wake up in lockstep and hammer the read cursor together.
//!
//! - [`JitterPolicy::None`]: no randomization, predictable intervals
//! - [`JitterPolicy::Full`]: random interval in [0, interval]
//! - [`JitterPolicy::Equal`]: interval/2 + random[0, interval/2]

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of sleep intervals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: sleep for the exact interval.
    #[default]
    None,

    /// Full jitter: random interval in [0, interval].
    Full,

    /// Equal jitter: interval/2 + random[0, interval/2].
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to the given interval.
    pub fn apply(&self, interval: Duration) -> Duration {
        match self {
            JitterPolicy::None => interval,
            JitterPolicy::Full => full_jitter(interval),
            JitterPolicy::Equal => equal_jitter(interval),
        }
    }
}

/// random[0, interval]
fn full_jitter(interval: Duration) -> Duration {
    let us = interval.as_micros() as u64;
    if us == 0 {
        return Duration::ZERO;
    }
    Duration::from_micros(rand::rng().random_range(0..=us))
}

/// interval/2 + random[0, interval/2]
fn equal_jitter(interval: Duration) -> Duration {
    let us = interval.as_micros() as u64;
    if us == 0 {
        return Duration::ZERO;
    }
    let half = us / 2;
    let jitter = if half == 0 {
        0
    } else {
        rand::rng().random_range(0..=half)
    };
    Duration::from_micros(half + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_identity() {
        let d = Duration::from_micros(750);
        assert_eq!(JitterPolicy::None.apply(d), d);
    }

    #[test]
    fn test_full_jitter_bounds() {
        let d = Duration::from_millis(1);
        for _ in 0..200 {
            assert!(JitterPolicy::Full.apply(d) <= d);
        }
    }

    #[test]
    fn test_equal_jitter_bounds() {
        let d = Duration::from_millis(1);
        for _ in 0..200 {
            let j = JitterPolicy::Equal.apply(d);
            assert!(j >= Duration::from_micros(500));
            assert!(j <= d);
        }
    }

    #[test]
    fn test_zero_interval_stays_zero() {
        assert_eq!(JitterPolicy::Full.apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(JitterPolicy::Equal.apply(Duration::ZERO), Duration::ZERO);
    }
}
