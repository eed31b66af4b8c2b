use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tollgate::{Admission, BucketConfig, BucketStatus, TokenBucket};

fn bucket(capacity: u64, interval: Duration) -> TokenBucket {
    TokenBucket::new(BucketConfig::new(capacity, interval).expect("valid config"))
}

#[test]
fn size_stays_within_bounds_under_interleaving() {
    let b = bucket(4, Duration::from_millis(10));
    // Deterministic interleaving of refills (r) and admissions (a).
    let script = "rrraaaaarrrrrrraarararaaaaaarrrrrrrrrr";
    for step in script.chars() {
        match step {
            'r' => {
                b.refill();
            }
            _ => {
                b.try_admit();
            }
        }
        let status = b.status();
        assert!(status.current_size <= status.capacity, "overfilled at step {step}");
    }
    assert_eq!(b.status().current_size, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_never_double_spend() {
    const TOKENS: u64 = 25;
    const CALLERS: usize = 100;

    let b = bucket(TOKENS, Duration::from_secs(60));
    for _ in 0..TOKENS {
        assert!(b.refill());
    }

    let barrier = Arc::new(tokio::sync::Barrier::new(CALLERS));
    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let b = b.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                b.try_admit()
            })
        })
        .collect();

    let results: Vec<Admission> =
        futures::future::join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();

    let admitted = results.iter().filter(|d| d.is_admitted()).count();
    let rejected = results.iter().filter(|d| d.is_rejected()).count();
    assert_eq!(admitted, TOKENS as usize);
    assert_eq!(rejected, CALLERS - TOKENS as usize);

    // Each admission saw a distinct post-removal count.
    let mut remaining: Vec<u64> =
        results.iter().filter(|d| d.is_admitted()).map(|d| d.remaining()).collect();
    remaining.sort_unstable();
    assert_eq!(remaining, (0..TOKENS).collect::<Vec<_>>());
    assert!(results.iter().filter(|d| d.is_rejected()).all(|d| d.remaining() == 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn size_stays_within_bounds_with_refill_and_callers_racing() {
    const CAPACITY: u64 = 3;
    const CALLERS: usize = 8;

    let b = bucket(CAPACITY, Duration::from_millis(1));
    let refill = b.start().unwrap();
    let stop = Arc::new(AtomicBool::new(false));

    let callers: Vec<_> = (0..CALLERS)
        .map(|_| {
            let b = b.clone();
            let stop = stop.clone();
            tokio::spawn(async move {
                let mut admitted = 0usize;
                while !stop.load(Ordering::Relaxed) {
                    if b.try_admit().is_admitted() {
                        admitted += 1;
                    }
                    tokio::task::yield_now().await;
                }
                admitted
            })
        })
        .collect();

    let checker = {
        let b = b.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            let mut reads = 0u64;
            while !stop.load(Ordering::Relaxed) {
                let status = b.status();
                assert_eq!(status.capacity, CAPACITY);
                assert!(status.current_size <= CAPACITY, "overfilled: {status:?}");
                reads += 1;
                tokio::task::yield_now().await;
            }
            reads
        })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    stop.store(true, Ordering::Relaxed);

    let admitted: usize =
        futures::future::join_all(callers).await.into_iter().map(|r| r.unwrap()).sum();
    let reads = checker.await.expect("checker saw an overfilled bucket");
    refill.stop().await;

    assert!(reads > 0);
    assert!(admitted > 0, "refilled tokens should reach callers");
    assert!(b.status().current_size <= CAPACITY);
}

#[test]
fn refilling_a_full_bucket_is_a_no_op() {
    let b = TokenBucket::full(BucketConfig::new(3, Duration::from_secs(1)).unwrap());
    for _ in 0..100 {
        assert!(!b.refill());
        assert_eq!(b.status().current_size, 3);
    }
}

#[test]
fn capacity_ticks_fill_an_empty_bucket() {
    let b = bucket(5, Duration::from_millis(10));
    for _ in 0..5 {
        assert!(b.refill());
    }
    assert_eq!(b.status().current_size, 5);
    assert!(!b.refill(), "one tick past capacity changes nothing");
    assert_eq!(b.status().current_size, 5);
}

#[tokio::test(start_paused = true)]
async fn refill_process_fills_linearly() {
    let capacity = 4;
    let interval = Duration::from_millis(100);
    let b = bucket(capacity, interval);
    let handle = b.start().unwrap();

    // Sample halfway between ticks so no sample races a tick.
    tokio::time::sleep(interval / 2).await;
    for expected in 1..=capacity {
        tokio::time::sleep(interval).await;
        assert_eq!(b.status().current_size, expected);
    }
    tokio::time::sleep(interval).await;
    assert_eq!(b.status().current_size, capacity);

    handle.stop().await;
}

#[test]
fn three_tokens_then_rejection() {
    let b = bucket(3, Duration::from_secs(1));
    for _ in 0..3 {
        b.refill();
    }

    assert_eq!(b.try_admit(), Admission::Admitted { remaining: 2 });
    assert_eq!(b.try_admit(), Admission::Admitted { remaining: 1 });
    assert_eq!(b.try_admit(), Admission::Admitted { remaining: 0 });

    let fourth = b.try_admit();
    assert_eq!(fourth, Admission::Rejected { retry_after: Duration::from_secs(1) });
    assert_eq!(fourth.remaining(), 0);
}

#[tokio::test(start_paused = true)]
async fn running_refill_caps_at_capacity() {
    let b = bucket(2, Duration::from_millis(100));
    let handle = b.start().unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(b.status(), BucketStatus { capacity: 2, current_size: 2 });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(b.status().current_size, 2, "third tick must not overfill");

    handle.stop().await;
}

#[test]
fn status_is_idempotent() {
    let b = bucket(3, Duration::from_secs(1));
    b.refill();
    let first = b.status();
    for _ in 0..10 {
        assert_eq!(b.status(), first);
    }
}

#[tokio::test(start_paused = true)]
async fn rejected_caller_can_retry_after_hint() {
    let b = bucket(1, Duration::from_millis(200));
    let handle = b.start().unwrap();

    let wait = b.try_admit().retry_after().expect("empty bucket rejects");
    tokio::time::sleep(wait + Duration::from_millis(1)).await;
    assert!(b.try_admit().is_admitted());

    handle.stop().await;
}
