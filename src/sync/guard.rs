//! `RawGuard` — the creation-path mutex of a holder.
//!
//! Under loom the guard delegates blocking to `loom::sync::Mutex`, so the
//! model checker parks contenders instead of exploring spin iterations. The
//! state word is kept only to answer [`RawGuard::is_locked`].

#[cfg(not(loom))]
use crossbeam_utils::Backoff;

use super::{AtomicU32, Ordering};
#[cfg(not(loom))]
use super::{wait_on_u32, wake_one_u32};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;
#[cfg(not(loom))]
const CONTENDED: u32 = 2;

/// A small futex-backed mutex guarding no data of its own.
///
/// A holder takes it only when its fast-path read found the slot empty, so
/// it is tuned for short, rare critical sections: a few spin rounds with
/// exponential backoff, then park on the state word.
pub struct RawGuard {
    /// 0: unlocked, 1: locked, 2: locked & contended
    state: AtomicU32,
    spin_rounds: u32,
    #[cfg(loom)]
    parking: loom::sync::Mutex<()>,
}

impl RawGuard {
    /// Default number of backoff rounds before parking.
    pub const DEFAULT_SPIN_ROUNDS: u32 = 10;

    /// Creates an unlocked guard with the default spin budget.
    #[cfg(not(loom))]
    pub const fn new() -> Self {
        Self::with_spin_rounds(Self::DEFAULT_SPIN_ROUNDS)
    }

    /// Creates an unlocked guard that spins `spin_rounds` times before parking.
    #[cfg(not(loom))]
    pub const fn with_spin_rounds(spin_rounds: u32) -> Self {
        Self {
            state: AtomicU32::new(UNLOCKED),
            spin_rounds,
        }
    }

    /// Creates an unlocked guard with the default spin budget.
    #[cfg(loom)]
    pub fn new() -> Self {
        Self::with_spin_rounds(Self::DEFAULT_SPIN_ROUNDS)
    }

    /// Creates an unlocked guard; loom never spins, the budget is only recorded.
    #[cfg(loom)]
    pub fn with_spin_rounds(spin_rounds: u32) -> Self {
        Self {
            state: AtomicU32::new(UNLOCKED),
            spin_rounds,
            parking: loom::sync::Mutex::new(()),
        }
    }

    /// Acquires the guard, blocking the current thread until it is able to do so.
    #[cfg(not(loom))]
    pub fn lock(&self) -> GuardLock<'_> {
        if self
            .state
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.lock_slow();
        }
        GuardLock { guard: self }
    }

    /// Attempts to acquire the guard without blocking.
    #[cfg(not(loom))]
    pub fn try_lock(&self) -> Option<GuardLock<'_>> {
        self.state
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| GuardLock { guard: self })
    }

    /// Acquires the guard, blocking the current thread until it is able to do so.
    #[cfg(loom)]
    pub fn lock(&self) -> GuardLock<'_> {
        // The mutex guards `()`, so a poisoned lock carries no broken state.
        let parked = self
            .parking
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        self.state.store(LOCKED, Ordering::Relaxed);
        GuardLock {
            guard: self,
            _parked: parked,
        }
    }

    /// Attempts to acquire the guard without blocking.
    #[cfg(loom)]
    pub fn try_lock(&self) -> Option<GuardLock<'_>> {
        let parked = self.parking.try_lock().ok()?;
        self.state.store(LOCKED, Ordering::Relaxed);
        Some(GuardLock {
            guard: self,
            _parked: parked,
        })
    }

    /// Returns `true` if some thread currently holds the guard.
    ///
    /// Only a snapshot; the answer may be stale by the time it is read.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) != UNLOCKED
    }

    /// Spin budget this guard was built with.
    #[inline]
    pub fn spin_rounds(&self) -> u32 {
        self.spin_rounds
    }

    #[cfg(not(loom))]
    #[cold]
    fn lock_slow(&self) {
        let backoff = Backoff::new();
        for _ in 0..self.spin_rounds {
            if self.state.load(Ordering::Relaxed) == UNLOCKED
                && self
                    .state
                    .compare_exchange_weak(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                return;
            }
            backoff.spin();
        }

        // A thread that has parked once acquires as CONTENDED, so its unlock
        // still wakes whoever else is parked.
        while self.state.swap(CONTENDED, Ordering::Acquire) != UNLOCKED {
            wait_on_u32(&self.state, CONTENDED);
        }
    }

    /// # Safety
    ///
    /// Must only be called by the thread that currently holds the guard.
    unsafe fn unlock(&self) {
        #[cfg(not(loom))]
        {
            if self.state.swap(UNLOCKED, Ordering::Release) == CONTENDED {
                wake_one_u32(&self.state);
            }
        }
        // The loom mutex itself is released when `GuardLock::_parked` drops.
        #[cfg(loom)]
        {
            self.state.store(UNLOCKED, Ordering::Relaxed);
        }
    }
}

impl Default for RawGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for RawGuard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawGuard")
            .field("locked", &self.is_locked())
            .field("spin_rounds", &self.spin_rounds)
            .finish()
    }
}

/// Proof of holding a [`RawGuard`]; releases it on drop, unwinding included.
#[must_use = "the guard is released as soon as the lock is dropped"]
pub struct GuardLock<'a> {
    guard: &'a RawGuard,
    #[cfg(loom)]
    _parked: loom::sync::MutexGuard<'a, ()>,
}

impl Drop for GuardLock<'_> {
    fn drop(&mut self) {
        // SAFETY: a `GuardLock` only exists while its thread holds the guard.
        unsafe {
            self.guard.unlock();
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_lock_unlock() {
        let guard = RawGuard::new();
        assert!(!guard.is_locked());
        {
            let _lock = guard.lock();
            assert!(guard.is_locked());
            assert!(guard.try_lock().is_none());
        }
        assert!(!guard.is_locked());
        assert!(guard.try_lock().is_some());
    }

    #[test]
    fn test_mutual_exclusion() {
        let guard = RawGuard::with_spin_rounds(0);
        let inside = AtomicUsize::new(0);
        let total = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..500 {
                        let _lock = guard.lock();
                        assert_eq!(inside.fetch_add(1, Ordering::Relaxed), 0);
                        total.fetch_add(1, Ordering::Relaxed);
                        inside.fetch_sub(1, Ordering::Relaxed);
                    }
                });
            }
        });

        assert_eq!(total.load(Ordering::Relaxed), 8 * 500);
        assert!(!guard.is_locked());
    }

    #[test]
    fn test_released_on_panic() {
        let guard = RawGuard::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _lock = guard.lock();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(!guard.is_locked());
    }
}
