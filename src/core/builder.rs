use std::io;
use std::sync::Arc;

use super::bus::{EventBus, Shared};
use super::config::Config;
use super::{EventKey, Identity, Payload};

/// Builder for an [`EventBus`] with coalescing and metrics tracking set up before
/// any thread starts.
///
/// ## Example
/// ```rust
/// use eventring::{Config, EventBus, OverflowPolicy};
///
/// let cfg = Config {
///     capacity: 64,
///     overflow: OverflowPolicy::WaitUntilAvailable,
///     ..Config::default()
/// };
///
/// let bus: EventBus<&'static str, (u32, f64)> = EventBus::builder(cfg)
///     .with_coalescing("quote", |q: &(u32, f64)| u64::from(q.0))
///     .with_metrics_tracking(["quote"])
///     .build()
///     .unwrap();
///
/// assert_eq!(bus.capacity(), Some(64));
/// assert!(bus.key_metrics(&"quote").is_some());
/// ```
pub struct EventBusBuilder<K: EventKey, P: Payload, I: Identity = u64> {
    shared: Shared<K, P, I>,
}

impl<K: EventKey, P: Payload, I: Identity> EventBusBuilder<K, P, I> {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            shared: Shared::new(cfg),
        }
    }

    /// Enables coalescing for `key` with the given identity function.
    pub fn with_coalescing<F>(self, key: K, provider: F) -> Self
    where
        F: Fn(&P) -> I + Send + Sync + 'static,
    {
        self.shared.coalescer.enable(key, Arc::new(provider));
        self
    }

    /// Enables per-key metrics for `keys`.
    pub fn with_metrics_tracking(self, keys: impl IntoIterator<Item = K>) -> Self {
        for key in keys {
            self.shared.metrics.track(key);
        }
        self
    }

    /// Builds the bus and starts its consumer threads.
    ///
    /// Fails only if the OS refuses to spawn a thread.
    pub fn build(self) -> io::Result<EventBus<K, P, I>> {
        EventBus::start(self.shared)
    }
}
