#![cfg(not(loom))]

use anyhow::{anyhow, bail};
use solo::{HolderState, LazySingletonHolder};
use std::error::Error as _;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;

#[derive(Debug)]
struct Connection {
    attempt: usize,
}

#[test]
fn test_fail_then_succeed() {
    let attempts = AtomicUsize::new(0);
    let holder = LazySingletonHolder::new(|| {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == 1 {
            bail!("backend unavailable");
        }
        Ok(Connection { attempt })
    });

    let err = holder.instance().unwrap_err();
    assert!(err.type_name().ends_with("Connection"));
    assert_eq!(err.cause().to_string(), "backend unavailable");
    assert_eq!(err.source().unwrap().to_string(), "backend unavailable");
    assert_eq!(holder.state(), HolderState::Absent);
    assert!(holder.get().is_none());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    let conn = holder.instance().unwrap();
    assert_eq!(conn.attempt, 2);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);

    // Converged: no further attempts.
    for _ in 0..10 {
        assert!(std::ptr::eq(holder.instance().unwrap(), conn));
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_each_retry_is_one_attempt() {
    let attempts = AtomicUsize::new(0);
    let holder = LazySingletonHolder::new(|| {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= 3 {
            Err(anyhow!("attempt {attempt} failed"))
        } else {
            Ok(attempt)
        }
    });

    for k in 1..=3 {
        let err = holder.instance().unwrap_err();
        assert_eq!(err.cause().to_string(), format!("attempt {k} failed"));
        assert_eq!(attempts.load(Ordering::SeqCst), k);
        assert!(!holder.is_initialized());
    }

    assert_eq!(*holder.instance().unwrap(), 4);
    let stats = holder.stats();
    assert_eq!(stats.construction_attempts, 4);
    assert_eq!(stats.construction_failures, 3);
    assert_eq!(stats.successful_constructions(), 1);
}

#[test]
fn test_failing_batch_then_converging_batch() {
    const THREADS: usize = 16;

    let failing = AtomicBool::new(true);
    let attempts = AtomicUsize::new(0);
    let holder = LazySingletonHolder::new(|| {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if failing.load(Ordering::SeqCst) {
            bail!("warming up");
        }
        Ok(Connection { attempt })
    });

    // Every caller in the first batch runs its own attempt and sees its error.
    let barrier = Barrier::new(THREADS);
    let errors = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    holder.instance().map(|_| ()).unwrap_err().to_string()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    });
    assert_eq!(errors.len(), THREADS);
    assert!(errors.iter().all(|e| e.contains("Connection")));
    assert_eq!(attempts.load(Ordering::SeqCst), THREADS);
    assert_eq!(holder.state(), HolderState::Absent);

    failing.store(false, Ordering::SeqCst);

    let ptrs: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    holder.instance().unwrap() as *const Connection as usize
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(ptrs.iter().all(|&p| p == ptrs[0]));
    assert_eq!(attempts.load(Ordering::SeqCst), THREADS + 1);
    assert_eq!(holder.instance().unwrap().attempt, THREADS + 1);
}

#[test]
fn test_waiters_behind_failure_are_not_stranded() {
    let first = AtomicBool::new(true);
    let entered = Barrier::new(2);
    let holder = LazySingletonHolder::new(|| {
        if first.swap(false, Ordering::SeqCst) {
            // Let the second caller queue on the guard before failing.
            entered.wait();
            thread::sleep(std::time::Duration::from_millis(20));
            bail!("first attempt fails");
        }
        Ok(7_u32)
    });

    let (a, b) = thread::scope(|s| {
        let a = s.spawn(|| holder.instance().map(|v| *v).map_err(|e| e.to_string()));
        let b = s.spawn(|| {
            entered.wait();
            // The first attempt is still running and holding the guard.
            assert_eq!(holder.state(), HolderState::Constructing);
            holder.instance().map(|v| *v).map_err(|e| e.to_string())
        });
        (a.join().unwrap(), b.join().unwrap())
    });

    assert!(a.is_err());
    assert_eq!(b, Ok(7));
    let stats = holder.stats();
    assert_eq!(stats.construction_attempts, 2);
    assert_eq!(stats.construction_failures, 1);
    assert_eq!(stats.second_check_hits, 0);
}

#[test]
fn test_panicking_initializer_releases_guard() {
    let attempts = AtomicUsize::new(0);
    let holder = LazySingletonHolder::new(|| {
        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("initializer panicked");
        }
        Ok(String::from("recovered"))
    });

    let result = panic::catch_unwind(AssertUnwindSafe(|| holder.instance().map(|_| ())));
    assert!(result.is_err());
    assert_eq!(holder.state(), HolderState::Absent);
    assert_eq!(holder.stats().construction_failures, 1);

    // Would deadlock if the guard were still held.
    assert_eq!(holder.instance().unwrap(), "recovered");
    assert_eq!(holder.stats().construction_attempts, 2);
}

#[test]
fn test_stats_snapshots_during_failing_attempts() {
    let holder: LazySingletonHolder<u32, _> = LazySingletonHolder::new(|| bail!("never builds"));
    let running = AtomicUsize::new(3);

    thread::scope(|s| {
        for _ in 0..3 {
            s.spawn(|| {
                for _ in 0..2_000 {
                    assert!(holder.instance().is_err());
                }
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        s.spawn(|| {
            while running.load(Ordering::SeqCst) > 0 {
                let stats = holder.stats();
                assert_eq!(stats.successful_constructions(), 0);
                assert!(holder.get().is_none());
            }
        });
    });

    let stats = holder.stats();
    assert_eq!(stats.construction_attempts, 3 * 2_000);
    assert_eq!(stats.construction_failures, 3 * 2_000);
    assert_eq!(stats.successful_constructions(), 0);
}
