use serde::{Deserialize, Serialize};

use crate::sync::{loom_const_fn, AtomicU64, Ordering};

/// Slow-path counters. Relaxed, and never touched on the fast path.
pub(super) struct Counters {
    guard_acquisitions: AtomicU64,
    construction_attempts: AtomicU64,
    construction_failures: AtomicU64,
    second_check_hits: AtomicU64,
}

impl Counters {
    loom_const_fn! {
        pub(super) fn new() -> Self {
            Self {
                guard_acquisitions: AtomicU64::new(0),
                construction_attempts: AtomicU64::new(0),
                construction_failures: AtomicU64::new(0),
                second_check_hits: AtomicU64::new(0),
            }
        }
    }

    #[inline]
    pub(super) fn guard_acquired(&self) {
        self.guard_acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(super) fn attempt_started(&self) {
        self.construction_attempts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(super) fn attempt_failed(&self) {
        self.construction_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(super) fn second_check_hit(&self) {
        self.second_check_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn snapshot(&self) -> HolderStats {
        HolderStats {
            guard_acquisitions: self.guard_acquisitions.load(Ordering::Relaxed),
            construction_attempts: self.construction_attempts.load(Ordering::Relaxed),
            construction_failures: self.construction_failures.load(Ordering::Relaxed),
            second_check_hits: self.second_check_hits.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a holder's slow-path counters.
///
/// The counters are independent relaxed atomics, so a snapshot taken while
/// other threads are inside the slow path is not a consistent cut.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderStats {
    /// Times any thread acquired the creation guard.
    pub guard_acquisitions: u64,
    /// Times the initializer was invoked.
    pub construction_attempts: u64,
    /// Initializer invocations that returned an error or panicked.
    pub construction_failures: u64,
    /// Guard acquisitions that found the slot already filled by another thread.
    pub second_check_hits: u64,
}

impl HolderStats {
    /// Attempts that published an instance. At most one.
    ///
    /// Saturates at zero: a snapshot racing a failing attempt may read its
    /// failure without its start.
    pub fn successful_constructions(&self) -> u64 {
        self.construction_attempts
            .saturating_sub(self.construction_failures)
    }
}
