//! # Backpressure bridge: many pushing threads, one bounded pull sequence.
//!
//! [`Bridge`] turns a push source into a lazily pulled [`BridgeStream`]. The buffer
//! never holds more than `capacity` elements: a producer pushing into a full bridge
//! blocks until a stream pulls.
//!
//! ```text
//! producer A ─push()─┐                        ┌─► BridgeStream::next() ─► consumer
//! producer B ─push()─┼─► [ bounded FIFO (N) ] ┤
//! producer C ─push()─┘   + completed flag     └─► (cancel token, close action once)
//! ```
//!
//! ## Rules
//! - `push` blocks while full; fails with [`BridgeError::StreamClosed`](crate::BridgeError)
//!   once `complete()` was called, even if it was already blocked.
//! - `complete()` is idempotent; elements buffered before it are still delivered.
//! - A stream ends when the bridge is completed and empty, or when it is cancelled.
//! - Each pull waits at most the poll timeout before re-checking cancellation.
//! - The close action runs exactly once per stream: on end, cancel, or drop.

mod channel;
mod stream;

use std::sync::Arc;

pub use channel::Bridge;
pub use stream::BridgeStream;

/// Callback run when a [`BridgeStream`] finishes.
pub type CloseAction = Arc<dyn Fn() + Send + Sync>;
