//! Fingerprint Cache
//!
//! Time-based memoization keyed by a fingerprint string. At most one
//! computation per key is in flight; concurrent callers for the same key
//! await that computation instead of starting their own.
//!
//! The caller owns key derivation: a fingerprint must encode every input
//! that affects the computed value, otherwise stale values are returned
//! for changed inputs.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::error::{HawalaError, HawalaResult};

struct Slot<T> {
    cell: OnceCell<(T, Instant)>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    /// A slot still computing is never expired
    fn is_expired(&self, max_age: Duration) -> bool {
        match self.cell.get() {
            Some((_, inserted)) => inserted.elapsed() >= max_age,
            None => false,
        }
    }
}

/// Expired slots, and failed slots nobody is awaiting, can go
fn is_stale<T>(slot: &Arc<Slot<T>>, max_age: Duration) -> bool {
    slot.is_expired(max_age) || (slot.cell.get().is_none() && Arc::strong_count(slot) == 1)
}

/// Single-flight, time-evicting cache
pub struct FingerprintCache<T> {
    entries: Mutex<HashMap<String, Arc<Slot<T>>>>,
    max_age: Duration,
}

impl<T: Clone + Send + Sync> FingerprintCache<T> {
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_age,
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Return the cached value for `key`, or compute it once.
    ///
    /// Failed computations are not cached; the next caller retries.
    pub async fn get<F, Fut>(&self, key: &str, compute: F) -> HawalaResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = HawalaResult<T>>,
    {
        let slot = {
            let mut entries = self.entries.lock().map_err(|_| HawalaError::internal("Lock failed"))?;
            match entries.get(key) {
                Some(slot) if !slot.is_expired(self.max_age) => slot.clone(),
                _ => {
                    crate::log_debug!("cache", "Cache miss", key = key);
                    let max_age = self.max_age;
                    entries.retain(|_, slot| !is_stale(slot, max_age));
                    let slot = Arc::new(Slot::new());
                    entries.insert(key.to_string(), slot.clone());
                    slot
                }
            }
        };

        let (value, _) = slot
            .cell
            .get_or_try_init(move || async move { compute().await.map(|value| (value, Instant::now())) })
            .await?;
        Ok(value.clone())
    }

    /// Cached value for `key` if present and fresh
    pub fn peek(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock().ok()?;
        let slot = entries.get(key)?;
        if slot.is_expired(self.max_age) {
            return None;
        }
        slot.cell.get().map(|(value, _)| value.clone())
    }

    pub fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Remove expired entries
    pub fn cleanup(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            let max_age = self.max_age;
            entries.retain(|_, slot| !is_stale(slot, max_age));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_cache_basic() {
        let cache: FingerprintCache<String> = FingerprintCache::new(Duration::from_secs(10));

        let value = cache.get("key1", || async { Ok("value1".to_string()) }).await.unwrap();
        assert_eq!(value, "value1");

        // Second compute is ignored while the entry is fresh
        let value = cache.get("key1", || async { Ok("other".to_string()) }).await.unwrap();
        assert_eq!(value, "value1");
        assert_eq!(cache.peek("key2"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_expiry() {
        let cache: FingerprintCache<u32> = FingerprintCache::new(Duration::from_secs(60));

        cache.get("fees", || async { Ok(1) }).await.unwrap();
        assert_eq!(cache.peek("fees"), Some(1));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.peek("fees"), None);

        let value = cache.get("fees", || async { Ok(2) }).await.unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_concurrent_gets_collapse() {
        let cache = Arc::new(FingerprintCache::<u64>::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get("acc-1|send|dest|100", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: FingerprintCache<u64> = FingerprintCache::new(Duration::from_secs(60));

        let failed = cache
            .get("k", || async { Err(HawalaError::network_error("down")) })
            .await;
        assert!(failed.is_err());

        let value = cache.get("k", || async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_drops_expired() {
        let cache: FingerprintCache<u8> = FingerprintCache::new(Duration::from_secs(1));
        cache.get("a", || async { Ok(1) }).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        cache.get("b", || async { Ok(2) }).await.unwrap();

        cache.cleanup();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek("b"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_evicts_expired_keys() {
        let cache: FingerprintCache<u32> = FingerprintCache::new(Duration::from_secs(1));
        for amount in 0..1000 {
            cache.get(&format!("acc|send|{}", amount), || async move { Ok(amount) }).await.unwrap();
        }
        assert_eq!(cache.len(), 1000);

        tokio::time::advance(Duration::from_secs(10)).await;
        cache.get("acc|send|1000", || async { Ok(1000) }).await.unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_slots_are_evicted() {
        let cache: FingerprintCache<u64> = FingerprintCache::new(Duration::from_secs(60));
        for key in ["a", "b", "c"] {
            let _ = cache.get(key, || async { Err(HawalaError::network_error("down")) }).await;
        }

        cache.get("d", || async { Ok(1) }).await.unwrap();
        assert_eq!(cache.len(), 1);
    }
}
