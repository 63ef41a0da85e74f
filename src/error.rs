//! Error types used by the dispatcher and the backpressure bridge.
//!
//! This module defines two main error enums:
//!
//! - [`DispatchError`]: errors returned to producers by [`EventBus::emit`](crate::EventBus::emit).
//! - [`BridgeError`]: errors returned by [`Bridge::push`](crate::Bridge::push).
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//!
//! Observer failures are **not** represented here: they are caught at dispatch time,
//! logged per observer and counted, and never reach the producer.

use thiserror::Error;

/// # Errors returned to an emitting producer.
///
/// Only conditions the configured [`OverflowPolicy`](crate::OverflowPolicy) hands
/// back to the caller show up here; everything that happens during dispatch is
/// isolated on the consumer side.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The ring buffer had no free slot and the overflow policy is `Throw`.
    ///
    /// Recoverable: the caller may retry, drop, or escalate.
    #[error("ring buffer full (capacity {capacity})")]
    RingFull {
        /// Capacity of the ring buffer that rejected the event.
        capacity: usize,
    },

    /// The bus was shut down; no further events are accepted.
    #[error("event bus is shut down")]
    Closed,
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventring::DispatchError;
    ///
    /// let err = DispatchError::RingFull { capacity: 8 };
    /// assert_eq!(err.as_label(), "dispatch_ring_full");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::RingFull { .. } => "dispatch_ring_full",
            DispatchError::Closed => "dispatch_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DispatchError::RingFull { capacity } => format!("no free slot; capacity={capacity}"),
            DispatchError::Closed => "bus closed".to_string(),
        }
    }

    /// Indicates whether retrying the same emit later can succeed.
    ///
    /// ```
    /// use eventring::DispatchError;
    ///
    /// assert!(DispatchError::RingFull { capacity: 4 }.is_retryable());
    /// assert!(!DispatchError::Closed.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::RingFull { .. })
    }
}

/// # Errors produced by the backpressure bridge.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// `push` was called after `complete()`.
    ///
    /// A producer that sees this should stop producing; it is a programming error,
    /// not a transient condition.
    #[error("stream closed")]
    StreamClosed,
}

impl BridgeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// ```
    /// use eventring::BridgeError;
    ///
    /// assert_eq!(BridgeError::StreamClosed.as_label(), "bridge_stream_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BridgeError::StreamClosed => "bridge_stream_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BridgeError::StreamClosed => "push after complete()".to_string(),
        }
    }
}
