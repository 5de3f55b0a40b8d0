//! Thread-safe, lazily constructed singletons.
//!
//! A type implementing [`Singleton`] has exactly one instance per process.
//! The instance is built the first time [`Singleton::instance`] is called,
//! from whichever thread gets there first, and every caller afterwards
//! receives a `&'static` reference to the same storage.
//!
//! - **Exactly once**: concurrent first callers park until the winner's
//!   constructor returns; the constructor never runs twice.
//! - **Lock-free reads**: once constructed, access is a single atomic load.
//! - **Restricted construction**: the constructor receives a [`Construct`]
//!   token that only this crate can mint, so the type cannot be built by
//!   anyone but its accessor.
//! - **Ordered teardown**: a [`Teardown`] guard in `main` destroys every
//!   constructed singleton in reverse order of construction.
//! - **Tracing**: lifecycle events are reported to an optional callback set
//!   with [`set_trace_callback`].
//!
//! # Example
//!
//! ```rust
//! use singleton_once::{singleton, Construct, Singleton};
//!
//! struct Logger {
//!    prefix: String,
//! }
//!
//! impl Logger {
//!    fn new(_: Construct<Self>) -> Self {
//!       Logger { prefix: "[app]".to_string() }
//!    }
//! }
//!
//! singleton!(Logger => Logger::new);
//!
//! let handle = std::thread::spawn(|| Logger::instance() as *const Logger as usize);
//! let here = Logger::instance() as *const Logger as usize;
//! assert_eq!(handle.join().unwrap(), here);
//! assert_eq!(Logger::instance().prefix, "[app]");
//! ```
//!
//! The storage type can't be duplicated:
//!
//! ```compile_fail
//! use singleton_once::Slot;
//!
//! fn duplicate<T: Clone>(value: &T) -> T {
//!    value.clone()
//! }
//!
//! let slot: Slot<u32> = Slot::new();
//! let copy = duplicate(&slot);
//! ```
//!
//! # Construction failure
//!
//! A constructor that panics propagates the panic to the caller that ran it.
//! The slot goes back to its unconstructed state, any parked callers wake up,
//! and the next access runs the constructor again.

/// Errors returned by the accessors.
mod error;

/// Lifecycle events and the trace callback.
mod event;

/// The `Singleton` trait, construction token and `singleton!` macro.
mod singleton;

/// Per-type instance storage.
mod slot;

/// Atomic lifecycle state.
mod state;

/// Ordered destruction at program end.
mod teardown;

pub use error::{Result, SingletonError};
pub use event::{clear_trace_callback, set_trace_callback, SingletonEvent, TraceCallback};
pub use singleton::{Construct, Singleton};
pub use slot::Slot;
pub use teardown::{pending_teardown, Teardown};
