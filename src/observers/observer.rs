//! # Observer trait and closure adapter.
//!
//! [`Observe`] is the extension point for consumers of a key. Observers run on
//! whichever thread dispatches the event: a consumer thread in ring-backed mode,
//! the emitting thread in current-thread mode.
//!
//! ## Rules
//! - Keep `on_event` short; a slow observer delays every event drained by the same worker.
//! - Return `Err` for recoverable failures; it is logged and counted, never propagated.
//! - Panics are caught the same way, but prefer returning an error.
//!
//! ## Example
//! ```rust
//! use eventring::{ObserverFn, ObserverRef};
//!
//! let obs: ObserverRef<u64> = ObserverFn::arc("printer", |v: &u64| {
//!     println!("got {v}");
//!     Ok(())
//! });
//! assert_eq!(obs.name(), "printer");
//! ```

use std::borrow::Cow;
use std::sync::Arc;

/// Shared handle to an observer (`Arc<dyn Observe<P>>`).
pub type ObserverRef<P> = Arc<dyn Observe<P>>;

/// Handler for the payloads emitted under one event key.
pub trait Observe<P>: Send + Sync + 'static {
    /// Handles one payload.
    ///
    /// Errors and panics are isolated per observer.
    fn on_event(&self, data: &P) -> anyhow::Result<()>;

    /// Returns the observer name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose; override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Function-backed observer.
#[derive(Debug)]
pub struct ObserverFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ObserverFn<F> {
    /// Creates a new function-backed observer.
    ///
    /// Prefer [`ObserverFn::arc`] when you immediately need an [`ObserverRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the observer and returns it as a shared handle.
    pub fn arc<P>(name: impl Into<Cow<'static, str>>, f: F) -> ObserverRef<P>
    where
        F: Fn(&P) -> anyhow::Result<()> + Send + Sync + 'static,
        P: 'static,
    {
        Arc::new(Self::new(name, f))
    }
}

impl<P, F> Observe<P> for ObserverFn<F>
where
    F: Fn(&P) -> anyhow::Result<()> + Send + Sync + 'static,
    P: 'static,
{
    fn on_event(&self, data: &P) -> anyhow::Result<()> {
        (self.f)(data)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
