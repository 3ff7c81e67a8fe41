//! Synchronization plumbing for the holder: atomics, the creation guard, and
//! the address-wait primitives the guard parks on.
//!
//! Under `--cfg loom` the atomics are swapped for loom's model-checked
//! versions and the guard blocks on a `loom::sync::Mutex`.

/// Declares a function that is `const` in normal builds and a plain `fn`
/// under loom, whose atomics cannot be built in const context.
macro_rules! loom_const_fn {
    ($(#[$attr:meta])* $vis:vis fn $name:ident($($arg:ident: $ty:ty),* $(,)?) -> $ret:ty $body:block) => {
        #[cfg(not(loom))]
        $(#[$attr])*
        $vis const fn $name($($arg: $ty),*) -> $ret $body

        #[cfg(loom)]
        $(#[$attr])*
        $vis fn $name($($arg: $ty),*) -> $ret $body
    };
}
pub(crate) use loom_const_fn;

pub mod guard;

pub use guard::{GuardLock, RawGuard};

#[cfg(not(loom))]
pub(crate) use core::sync::atomic::{AtomicPtr, AtomicU32, AtomicU64, Ordering};
#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicPtr, AtomicU32, AtomicU64, Ordering};

#[cfg(all(windows, not(loom)))]
use windows_sys::Win32::System::Threading::{WaitOnAddress, WakeByAddressSingle};

#[cfg(all(target_os = "linux", not(loom)))]
use libc::{SYS_futex, FUTEX_PRIVATE_FLAG, FUTEX_WAIT, FUTEX_WAKE};

#[cfg(all(target_os = "linux", not(loom)))]
#[inline]
fn futex_wait(addr: *const u32, expected: u32) {
    // Spurious returns (EINTR, EAGAIN) are fine: callers re-check the word.
    unsafe {
        libc::syscall(
            SYS_futex,
            addr,
            FUTEX_WAIT | FUTEX_PRIVATE_FLAG,
            expected,
            core::ptr::null::<libc::timespec>(),
        );
    }
}

#[cfg(all(target_os = "linux", not(loom)))]
#[inline]
fn futex_wake(addr: *const u32, count: i32) {
    unsafe {
        libc::syscall(SYS_futex, addr, FUTEX_WAKE | FUTEX_PRIVATE_FLAG, count);
    }
}

/// Blocks while `addr` still holds `expected`.
///
/// May return spuriously; the caller loops on its own condition.
#[cfg(not(loom))]
#[inline]
pub fn wait_on_u32(addr: &core::sync::atomic::AtomicU32, expected: u32) {
    #[cfg(windows)]
    unsafe {
        let expected_ptr = &expected as *const u32 as *const _;
        let addr_ptr = addr as *const _ as *const _;
        WaitOnAddress(addr_ptr, expected_ptr, core::mem::size_of::<u32>(), u32::MAX);
    }
    #[cfg(target_os = "linux")]
    {
        if addr.load(core::sync::atomic::Ordering::Relaxed) == expected {
            futex_wait(addr.as_ptr(), expected);
        }
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    while addr.load(core::sync::atomic::Ordering::Relaxed) == expected {
        std::thread::yield_now();
    }
}

/// Wakes one thread parked in [`wait_on_u32`] on `addr`.
#[cfg(not(loom))]
#[inline]
pub fn wake_one_u32(addr: &core::sync::atomic::AtomicU32) {
    #[cfg(windows)]
    unsafe {
        WakeByAddressSingle(addr as *const _ as *const _);
    }
    #[cfg(target_os = "linux")]
    {
        futex_wake(addr.as_ptr(), 1);
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    let _ = addr;
}
