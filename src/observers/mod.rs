//! # Observers: per-key event handlers.
//!
//! This module provides the [`Observe`] trait, the closure adapter [`ObserverFn`],
//! and the [`Subscription`] handle returned by
//! [`EventBus::subscribe`](crate::EventBus::subscribe).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   emit(key, data) ──► EventBus ──► (ring slot) ──► consumer thread
//!                                                      │ lookup observers(key) at drain time
//!                                    ┌─────────────────┼─────────────────┐
//!                                    ▼                 ▼                 ▼
//!                             obs1.on_event()   obs2.on_event()   obsN.on_event()
//!                               (isolated)        (isolated)        (isolated)
//! ```
//!
//! ## Isolation
//! An observer that returns `Err` or panics is logged and counted; the remaining
//! observers for the same event still run and the slot is released normally.
//!
//! ## Implementing custom observers
//! ```no_run
//! use eventring::Observe;
//!
//! struct Audit;
//!
//! impl Observe<String> for Audit {
//!     fn on_event(&self, data: &String) -> anyhow::Result<()> {
//!         anyhow::ensure!(!data.is_empty(), "empty audit record");
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &str { "audit" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod observer;
mod subscription;

#[cfg(feature = "logging")]
pub use log::LogObserver;
pub use observer::{Observe, ObserverFn, ObserverRef};
pub use subscription::Subscription;
