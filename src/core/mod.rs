//! Dispatcher core: the public façade and the registries behind it.
//!
//! The only public entry points are [`EventBus`] and [`EventBusBuilder`], plus the
//! configuration types they are built from.
//!
//! Internal modules:
//! - [`bus`]: emit path, drain loop, lifecycle;
//! - [`registry`]: key → observer list (copy-on-write);
//! - [`coalesce`]: identity providers and the pending `(key, identity)` map;
//! - [`config`]: bus settings and clamping;
//! - [`builder`]: pre-start configuration of coalescing and metrics tracking.

mod builder;
mod bus;
mod coalesce;
mod config;
mod registry;

use std::fmt::Debug;
use std::hash::Hash;

pub use builder::EventBusBuilder;
pub use bus::EventBus;
pub use coalesce::IdProvider;
pub use config::{Config, DispatchMode};

/// Bounds required of event keys. Implemented for every type that satisfies them.
pub trait EventKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T: Eq + Hash + Clone + Debug + Send + Sync + 'static> EventKey for T {}

/// Bounds required of payloads. Implemented for every type that satisfies them.
pub trait Payload: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Payload for T {}

/// Bounds required of coalescing identities. Implemented for every type that satisfies them.
pub trait Identity: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T: Eq + Hash + Clone + Debug + Send + Sync + 'static> Identity for T {}
