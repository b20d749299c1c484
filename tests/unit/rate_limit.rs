//! Unit tests for keyed request pacing

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use docsync::client::KeyedRateLimiter;

#[tokio::test]
async fn test_consecutive_calls_on_one_key_are_spaced() {
    let limiter = KeyedRateLimiter::new(Duration::from_millis(40), 16);
    let start = Instant::now();
    limiter.throttle("doc", || async {}).await;
    limiter.throttle("doc", || async {}).await;
    limiter.throttle("doc", || async {}).await;
    assert!(start.elapsed() >= Duration::from_millis(80));
}

#[tokio::test]
async fn test_distinct_keys_proceed_independently() {
    let limiter = KeyedRateLimiter::new(Duration::from_millis(300), 16);
    let start = Instant::now();
    limiter.throttle("doc-a", || async {}).await;
    limiter.throttle("doc-b", || async {}).await;
    limiter.throttle("doc-c", || async {}).await;
    assert!(start.elapsed() < Duration::from_millis(200));
}

#[tokio::test]
async fn test_same_key_operations_serialize() {
    // Two concurrent operations on one key must not overlap even with a
    // zero pacing interval: the second starts only after the first ends.
    let limiter = Arc::new(KeyedRateLimiter::new(Duration::ZERO, 16));
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let limiter = Arc::clone(&limiter);
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        handles.push(tokio::spawn(async move {
            limiter
                .throttle("doc", || async {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_many_keys_do_not_accumulate_unbounded() {
    let limiter = KeyedRateLimiter::new(Duration::ZERO, 8);
    // Far more keys than the cap; the limiter must keep working.
    for i in 0..100 {
        let value = limiter.throttle(&format!("doc-{i}"), || async { i }).await;
        assert_eq!(value, i);
    }
}
