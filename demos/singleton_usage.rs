//! Singleton Usage Examples
//!
//! Demonstrates lazy, once-only construction shared across threads.

use solo::{singleton, HolderConfig, LazySingletonHolder, Singleton, Strategy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

static BUILDS: AtomicUsize = AtomicUsize::new(0);

struct Dictionary {
    words: Vec<&'static str>,
}

singleton!(Dictionary => {
    BUILDS.fetch_add(1, Ordering::SeqCst);
    println!("  Building dictionary...");
    thread::sleep(Duration::from_millis(50));
    Ok(Dictionary { words: vec!["alpha", "beta", "gamma"] })
});

fn main() {
    println!("Singleton Usage Examples");
    println!("========================");

    // Example 1: Many threads, one construction
    println!("\n1. Concurrent First Access:");
    let handles: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                let dict = Dictionary::instance().expect("dictionary builds");
                (i, dict as *const Dictionary as usize, dict.words.len())
            })
        })
        .collect();
    for handle in handles {
        let (i, addr, len) = handle.join().unwrap();
        println!("  Thread {i}: instance at {addr:#x}, {len} words");
    }
    println!("  Build count: {}", BUILDS.load(Ordering::SeqCst));
    println!("  Holder stats: {:?}", Dictionary::holder().stats());

    // Example 2: Failure is not cached
    println!("\n2. Retry After Failure:");
    let attempts = AtomicUsize::new(0);
    let flaky = LazySingletonHolder::new(|| {
        let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if n == 1 {
            anyhow::bail!("resource not ready (attempt {n})");
        }
        Ok(format!("ready after {n} attempts"))
    });
    match flaky.instance() {
        Ok(v) => println!("  Unexpected success: {v}"),
        Err(e) => println!("  First call failed: {e} ({})", e.cause()),
    }
    println!("  State after failure: {}", flaky.state());
    println!("  Second call: {}", flaky.instance().expect("second attempt succeeds"));

    // Example 3: Fast path versus fully locked
    println!("\n3. Access Cost:");
    let fast = LazySingletonHolder::new(|| Ok(0_u64));
    let locked =
        LazySingletonHolder::with_config(HolderConfig::new().strategy(Strategy::FullyLocked), || {
            Ok(0_u64)
        });
    fast.instance().unwrap();
    locked.instance().unwrap();

    const READS: u32 = 1_000_000;
    let start = Instant::now();
    for _ in 0..READS {
        std::hint::black_box(fast.instance().unwrap());
    }
    let fast_time = start.elapsed();

    let start = Instant::now();
    for _ in 0..READS {
        std::hint::black_box(locked.instance().unwrap());
    }
    let locked_time = start.elapsed();

    println!("  double_checked: {:?} per read", fast_time / READS);
    println!("  fully_locked:   {:?} per read", locked_time / READS);
    println!(
        "  Guard acquisitions: double_checked={}, fully_locked={}",
        fast.stats().guard_acquisitions,
        locked.stats().guard_acquisitions
    );

    println!("\nKey Properties:");
    println!("• One construction no matter how many threads race the first call");
    println!("• Initialized reads are a single acquire load");
    println!("• Failed construction leaves the holder empty for a retry");
}
