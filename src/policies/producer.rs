//! # Producer arity.
//!
//! [`ProducerArity`] selects how the ring's write cursor is advanced.
//!
//! ## Precondition
//! `Single` is a promise made by the caller: **only one thread ever emits** into the
//! bus. The promise is not checked. Breaking it lets two producers claim the same
//! slot and corrupts it silently.
//!
//! Under `OverflowPolicy::QueueForLater` the secondary worker also claims slots, so
//! the ring always uses `Multiple` there.

/// Number of threads allowed to claim slots concurrently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProducerArity {
    /// Exactly one producer thread; the write cursor is advanced with a plain load/store.
    Single,

    /// Any number of producer threads; the write cursor is advanced with compare-and-swap.
    #[default]
    Multiple,
}
