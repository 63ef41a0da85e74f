//! # LogObserver: payload logger
//!
//! A minimal observer that logs every payload it receives at `INFO` through `tracing`.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! INFO eventring::observers::log: event observer="log" payload=Quote { symbol: "ACME", px: 10.5 }
//! ```

use std::fmt::Debug;

use tracing::info;

use super::Observe;

/// Payload logger observer.
#[derive(Default)]
pub struct LogObserver;

impl LogObserver {
    /// Construct a new [`LogObserver`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<P: Debug + Send + Sync + 'static> Observe<P> for LogObserver {
    fn on_event(&self, data: &P) -> anyhow::Result<()> {
        info!(observer = "log", payload = ?data, "event");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
