//! Keyed request pacing.
//!
//! Each rate key owns an async mutex that is held for the full duration of
//! the operation it guards. That gives two properties at once: calls on
//! the same key run strictly one after another (concurrent edits to one
//! document serialize in arrival order), and consecutive calls on a key
//! are spaced by at least the configured minimum interval. Calls on
//! different keys proceed independently.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::sync::Mutex as TokioMutex;
use tracing::debug;

use crate::config::{MIN_REQUEST_INTERVAL_MS, RATE_KEY_CAP};

/// Rate key for calls not scoped to any particular document.
pub const GLOBAL_KEY: &str = "global";

struct KeySlot {
    /// Completion instant of the last call on this key. Held across the
    /// whole operation so same-key callers queue in FIFO order.
    last: Arc<TokioMutex<Option<Instant>>>,
    /// Last time the slot was handed out, for eviction ordering.
    touched: Instant,
}

/// Per-key pacing with a bounded key table.
pub struct KeyedRateLimiter {
    min_interval: Duration,
    max_keys: usize,
    slots: StdMutex<HashMap<String, KeySlot>>,
}

impl Default for KeyedRateLimiter {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(MIN_REQUEST_INTERVAL_MS),
            RATE_KEY_CAP,
        )
    }
}

impl KeyedRateLimiter {
    /// Create a limiter with an explicit interval and key capacity.
    pub fn new(min_interval: Duration, max_keys: usize) -> Self {
        Self {
            min_interval,
            max_keys,
            slots: StdMutex::new(HashMap::new()),
        }
    }

    /// Run `op` under the key's slot lock, delaying first so that at
    /// least the minimum interval has passed since the previous call on
    /// the same key completed.
    pub async fn throttle<T, F, Fut>(&self, key: &str, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let slot = self.slot(key);
        let mut last = slot.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(key, wait_ms = wait.as_millis() as u64, "Pacing request");
                tokio::time::sleep(wait).await;
            }
        }

        let result = op().await;
        *last = Some(Instant::now());
        result
    }

    /// Fetch or create the slot for `key`, evicting the oldest half of
    /// the table when it is full. Slots whose mutex still has outstanding
    /// holders are never evicted: replacing one would hand the next
    /// caller a fresh mutex and let it overlap an in-flight call on the
    /// same key.
    fn slot(&self, key: &str) -> Arc<TokioMutex<Option<Instant>>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());

        if !slots.contains_key(key) && slots.len() >= self.max_keys {
            let mut by_age: Vec<(String, Instant)> = slots
                .iter()
                .filter(|(_, s)| Arc::strong_count(&s.last) == 1)
                .map(|(k, s)| (k.clone(), s.touched))
                .collect();
            by_age.sort_by_key(|(_, touched)| *touched);
            let evicted = (slots.len() / 2).min(by_age.len());
            for (stale, _) in by_age.into_iter().take(evicted) {
                slots.remove(&stale);
            }
            debug!(evicted, "Evicted stale rate-limiter keys");
        }

        let now = Instant::now();
        let slot = slots.entry(key.to_string()).or_insert_with(|| KeySlot {
            last: Arc::new(TokioMutex::new(None)),
            touched: now,
        });
        slot.touched = now;
        Arc::clone(&slot.last)
    }

    /// Number of keys currently tracked.
    #[cfg(test)]
    fn key_count(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
