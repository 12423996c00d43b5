// tests/quota_concurrency.rs
// The check-and-increment pair must be indivisible: under 100 concurrent
// callers against a budget of 6, exactly 6 succeed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use chrono::{Duration, TimeZone, Utc};
use radwatch::quota::QuotaGovernor;

#[test]
fn one_hundred_threads_six_grants() {
    let quota = Arc::new(QuotaGovernor::new(6));
    let barrier = Arc::new(Barrier::new(100));
    let granted = Arc::new(AtomicUsize::new(0));
    let now = Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap();

    let mut handles = Vec::with_capacity(100);
    for _ in 0..100 {
        let quota = quota.clone();
        let barrier = barrier.clone();
        let granted = granted.clone();
        handles.push(std::thread::spawn(move || {
            barrier.wait();
            if quota.try_consume(now) {
                granted.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(granted.load(Ordering::SeqCst), 6);
    assert_eq!(quota.status(now).remaining, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn async_workers_with_jitter_never_overspend() {
    use rand::Rng;

    let quota = Arc::new(QuotaGovernor::new(6));
    let now = Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap();

    let mut tasks = Vec::with_capacity(100);
    for _ in 0..100 {
        let quota = quota.clone();
        let jitter = rand::rng().random_range(0..5u64);
        tasks.push(tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(jitter)).await;
            quota.try_consume(now)
        }));
    }

    let mut granted = 0usize;
    for t in tasks {
        if t.await.unwrap() {
            granted += 1;
        }
    }
    assert_eq!(granted, 6);
}

#[test]
fn rollover_reopens_the_budget_mid_process() {
    let quota = QuotaGovernor::new(6);
    let day1 = Utc.with_ymd_and_hms(2025, 8, 1, 23, 50, 0).unwrap();
    for _ in 0..6 {
        assert!(quota.try_consume(day1));
    }
    assert!(!quota.try_consume(day1));

    let day2 = day1 + Duration::minutes(20);
    assert_ne!(day1.date_naive(), day2.date_naive());
    assert!(quota.try_consume(day2), "budget reopens after rollover");
    assert_eq!(quota.status(day2).calls_used_today, 1);
}
