//! Per-key request coalescing for cache refreshes
//!
//! Concurrent refreshes of the same key must not fan out into duplicate
//! external lookups. The second caller parks on the first caller's key lock
//! and re-reads the cache once it is released.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Guarded registry of in-flight cache refreshes, keyed by lookup key
#[derive(Default)]
pub struct SingleFlight {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the key's flight lock. Callers holding the guard are the
    /// sole fetcher for that key; everyone else waits here, then re-checks
    /// the cache before fetching.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Cache-or-fetch worker following the intended call pattern:
    /// check, acquire, re-check, fetch.
    async fn resolve(
        flights: &SingleFlight,
        cache: &Mutex<Option<String>>,
        fetches: &AtomicU32,
    ) -> String {
        if let Some(hit) = cache.lock().await.clone() {
            return hit;
        }
        let _guard = flights.acquire("203.0.113.9").await;
        if let Some(hit) = cache.lock().await.clone() {
            return hit;
        }
        fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let value = "resolved.example.net".to_string();
        *cache.lock().await = Some(value.clone());
        value
    }

    #[tokio::test]
    async fn test_concurrent_lookups_coalesce() {
        let flights = Arc::new(SingleFlight::new());
        let cache = Arc::new(Mutex::new(None));
        let fetches = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flights = Arc::clone(&flights);
            let cache = Arc::clone(&cache);
            let fetches = Arc::clone(&fetches);
            handles.push(tokio::spawn(async move {
                resolve(&flights, &cache, &fetches).await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), "resolved.example.net");
        }
        // All eight callers were served by a single fetch.
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let flights = SingleFlight::new();
        let guard_a = flights.acquire("a").await;
        // A different key must be immediately acquirable while "a" is held.
        let guard_b = flights.acquire("b").await;
        drop(guard_a);
        drop(guard_b);
    }
}
