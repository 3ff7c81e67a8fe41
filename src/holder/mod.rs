//! `LazySingletonHolder` — a lazily constructed, shared single instance.
//!
//! The slot is an `AtomicPtr<T>`: null while absent, otherwise pointing at a
//! boxed, fully constructed value. Publication is a `Release` store and every
//! read is an `Acquire` load, so whatever the constructing thread wrote while
//! building the value happens-before any thread's observation of the pointer.

mod state;
mod stats;

use core::marker::PhantomData;
use core::ptr;

use crossbeam_utils::CachePadded;

use crate::config::{HolderConfig, Strategy};
use crate::error::ConstructionError;
use crate::log::holder_event;
use crate::sync::{loom_const_fn, AtomicPtr, Ordering, RawGuard};

pub use state::HolderState;
pub use stats::HolderStats;
use stats::Counters;

/// Owner of a single, lazily constructed instance of `T`.
///
/// The initializer runs on the first call to [`instance`](Self::instance)
/// and the result is shared by every later call from every thread. Once the
/// instance exists, `instance` is one acquire load and a null check.
///
/// The initializer is `Fn`, not `FnOnce`: a failed attempt leaves the holder
/// empty and the next caller simply tries again.
///
/// # Example
///
/// ```rust
/// use solo::LazySingletonHolder;
///
/// struct Registry {
///     entries: Vec<u32>,
/// }
///
/// static REGISTRY: LazySingletonHolder<Registry> =
///     LazySingletonHolder::new(|| Ok(Registry { entries: vec![1, 2, 3] }));
///
/// let a = REGISTRY.instance().unwrap();
/// let b = REGISTRY.instance().unwrap();
/// assert!(std::ptr::eq(a, b));
/// assert_eq!(a.entries.len(), 3);
/// ```
///
/// # Teardown
///
/// A holder in a `static` is never dropped, so its instance lives until the
/// process exits and `T`'s destructor does not run. A holder with a shorter
/// lifetime drops its instance along with itself.
///
/// # Deadlock
///
/// Calling `instance` on the same holder from inside its own initializer
/// blocks forever.
pub struct LazySingletonHolder<T, F = fn() -> anyhow::Result<T>> {
    slot: AtomicPtr<T>,
    guard: RawGuard,
    strategy: Strategy,
    stats: CachePadded<Counters>,
    init: F,
    _owns: PhantomData<Box<T>>,
}

impl<T, F> LazySingletonHolder<T, F> {
    /// Returns the instance if it has been published. Never constructs and
    /// never blocks.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        let ptr = self.slot.load(Ordering::Acquire);
        // SAFETY: a non-null slot points at a boxed `T` published with
        // `Release` and never freed while `self` is borrowed.
        unsafe { ptr.as_ref() }
    }

    /// Returns `true` once the instance is published.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        !self.slot.load(Ordering::Acquire).is_null()
    }

    /// Current lifecycle state. A snapshot; it may change immediately.
    pub fn state(&self) -> HolderState {
        if self.is_initialized() {
            HolderState::Present
        } else if self.guard.is_locked() {
            HolderState::Constructing
        } else {
            HolderState::Absent
        }
    }

    /// Copy of the slow-path counters.
    pub fn stats(&self) -> HolderStats {
        self.stats.snapshot()
    }

    /// The configuration this holder was built with.
    pub fn config(&self) -> HolderConfig {
        HolderConfig {
            strategy: self.strategy,
            spin_rounds: self.guard.spin_rounds(),
        }
    }

    /// Mutable access to the instance, if present.
    ///
    /// `&mut self` rules out concurrent callers, so no guard is taken.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        let ptr = self.slot.load(Ordering::Relaxed);
        // SAFETY: exclusive borrow of the holder; the box is owned by the slot.
        unsafe { ptr.as_mut() }
    }

    /// Consumes the holder, returning the instance if one was published.
    pub fn into_inner(self) -> Option<T> {
        let ptr = self.slot.swap(ptr::null_mut(), Ordering::Relaxed);
        if ptr.is_null() {
            None
        } else {
            // SAFETY: the pointer came from `Box::into_raw` and the slot no
            // longer refers to it, so `Drop` will not free it again.
            Some(*unsafe { Box::from_raw(ptr) })
        }
    }
}

impl<T, F> LazySingletonHolder<T, F>
where
    F: Fn() -> anyhow::Result<T>,
{
    loom_const_fn! {
        /// Creates an empty holder using the double-checked strategy.
        pub fn new(init: F) -> Self {
            Self::with_config(HolderConfig::new(), init)
        }
    }

    loom_const_fn! {
        /// Creates an empty holder with an explicit configuration.
        pub fn with_config(config: HolderConfig, init: F) -> Self {
            Self {
                slot: AtomicPtr::new(ptr::null_mut()),
                guard: RawGuard::with_spin_rounds(config.spin_rounds),
                strategy: config.strategy,
                stats: CachePadded::new(Counters::new()),
                init,
                _owns: PhantomData,
            }
        }
    }

    /// Returns the shared instance, constructing it if this is the first
    /// successful call.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError`] if this call ran the initializer and it
    /// failed. The holder remains empty and the guard is released, so a
    /// later call retries construction.
    #[inline]
    pub fn instance(&self) -> Result<&T, ConstructionError> {
        if self.strategy == Strategy::DoubleChecked {
            if let Some(value) = self.get() {
                return Ok(value);
            }
        }
        self.instance_slow()
    }

    #[cold]
    fn instance_slow(&self) -> Result<&T, ConstructionError> {
        let _lock = self.guard.lock();
        self.stats.guard_acquired();

        let ptr = self.slot.load(Ordering::Acquire);
        if !ptr.is_null() {
            if self.strategy == Strategy::DoubleChecked {
                self.stats.second_check_hit();
                holder_event!(trace, type_name = core::any::type_name::<T>(), "instance published while waiting for guard");
            }
            // SAFETY: see `get`.
            return Ok(unsafe { &*ptr });
        }

        self.construct()
    }

    /// Runs the initializer and publishes its value. Caller holds the guard.
    fn construct(&self) -> Result<&T, ConstructionError> {
        holder_event!(debug, type_name = core::any::type_name::<T>(), "constructing singleton instance");
        self.stats.attempt_started();

        let attempt = Attempt {
            counters: &self.stats,
            settled: false,
        };
        let outcome = (self.init)();
        attempt.settle(outcome.is_ok());

        match outcome {
            Ok(value) => {
                let ptr = Box::into_raw(Box::new(value));
                self.slot.store(ptr, Ordering::Release);
                holder_event!(debug, type_name = core::any::type_name::<T>(), "singleton instance published");
                // SAFETY: `ptr` was just produced by `Box::into_raw`.
                Ok(unsafe { &*ptr })
            }
            Err(source) => {
                holder_event!(warn, type_name = core::any::type_name::<T>(), error = %source, "singleton construction failed");
                Err(ConstructionError::new::<T>(source))
            }
        }
    }
}

/// Records an attempt as failed unless settled, so a panicking initializer
/// is counted like an erroring one.
struct Attempt<'a> {
    counters: &'a Counters,
    settled: bool,
}

impl Attempt<'_> {
    fn settle(mut self, succeeded: bool) {
        self.settled = true;
        if !succeeded {
            self.counters.attempt_failed();
        }
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.counters.attempt_failed();
            holder_event!(warn, "singleton initializer panicked");
        }
    }
}

impl<T: Default> Default for LazySingletonHolder<T> {
    fn default() -> Self {
        Self::new(|| Ok(T::default()))
    }
}

impl<T: core::fmt::Debug, F> core::fmt::Debug for LazySingletonHolder<T, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut d = f.debug_struct("LazySingletonHolder");
        d.field("state", &self.state());
        if let Some(value) = self.get() {
            d.field("value", value);
        }
        d.field("strategy", &self.strategy).finish()
    }
}

impl<T, F> Drop for LazySingletonHolder<T, F> {
    fn drop(&mut self) {
        let ptr = self.slot.load(Ordering::Relaxed);
        if !ptr.is_null() {
            // SAFETY: exclusive access in drop; the box is owned by the slot.
            drop(unsafe { Box::from_raw(ptr) });
        }
    }
}

// SAFETY: any thread may construct the value, any thread may read it, and
// whichever thread drops the holder drops the value. Hence `T: Send + Sync`
// for sharing and `T: Send` for moving.
unsafe impl<T: Send + Sync, F: Sync> Sync for LazySingletonHolder<T, F> {}
unsafe impl<T: Send, F: Send> Send for LazySingletonHolder<T, F> {}
