//! # `solo` - Double-Checked Lazy Singletons
//!
//! One instance per process, built on first use, and free to read afterwards.
//!
//! The core type is [`LazySingletonHolder`]: an atomic instance slot plus a
//! small futex guard. Reads take the fast path, a single `Acquire` load; only
//! while the slot is still empty does a caller take the guard, re-check, and
//! construct.
//!
//! ## Guarantees
//!
//! - **At most one instance**: concurrent first-time callers serialize on the
//!   guard, and all but the winner find the slot filled on the second check.
//! - **Monotonic**: once published, the slot is never cleared through a shared
//!   reference.
//! - **Complete on sight**: the instance is published with a `Release` store
//!   and read with `Acquire` loads, so no thread sees a partially built value.
//! - **Retryable failure**: an initializer error or panic releases the guard,
//!   leaves the slot empty, and reaches only the thread that ran it.
//!
//! ## Strategies
//!
//! [`Strategy::DoubleChecked`] is the default. [`Strategy::FullyLocked`]
//! holds the guard across every check-create-return sequence instead; it
//! costs a lock round-trip per call and does not depend on the slot's
//! acquire/release pairing.
//!
//! ## Features
//!
//! - `tracing`: emit construction events (`solo::holder` target) through
//!   [`tracing`](https://docs.rs/tracing).
//!
//! ## Example
//!
//! ```rust
//! use solo::{singleton, Singleton};
//!
//! pub struct Config {
//!     pub workers: usize,
//! }
//!
//! singleton!(Config => {
//!     let workers = std::env::var("WORKERS").ok().and_then(|v| v.parse().ok()).unwrap_or(4);
//!     Ok(Config { workers })
//! });
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|_| std::thread::spawn(|| Config::instance().unwrap() as *const Config as usize))
//!     .collect();
//! let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
//! assert!(addrs.windows(2).all(|w| w[0] == w[1]));
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod log;

pub mod sync;

pub mod config;
pub mod error;
pub mod holder;
pub mod singleton;

pub use config::{HolderConfig, Strategy};
pub use error::ConstructionError;
pub use holder::{HolderState, HolderStats, LazySingletonHolder};
pub use singleton::Singleton;

// Compile-time layout checks.
#[cfg(not(loom))]
const _: () = {
    use core::mem;

    // The fast path reads one pointer-sized word.
    assert!(mem::size_of::<sync::AtomicPtr<u64>>() == mem::size_of::<usize>());
    // An empty slot is a null pointer, so `get` is a plain `Option<&T>` niche.
    assert!(mem::size_of::<Option<&u64>>() == mem::size_of::<usize>());
};
