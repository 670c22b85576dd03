//! Read-through caching of computed aggregates.
//!
//! Cache failures never fail a request: reads degrade to a miss and writes
//! are dropped, both with a warning.

use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::CacheError;

pub mod invalidation;
pub mod keys;
pub mod memory;
pub mod noop;

pub use memory::MemoryCache;
pub use noop::NoopCache;

/// String key/value store with per-entry expiry and glob invalidation.
#[async_trait]
pub trait Cache: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError>;

    /// Removes every key matching `pattern`, where `*` matches any run of
    /// characters and `?` exactly one. Returns the number of keys removed.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError>;
}

/// Cached value under `key`, or `None` on a miss, an expired entry, a
/// backend failure or an undecodable payload.
pub async fn load_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Option<T> {
    let payload = match cache.get(key).await {
        Ok(payload) => payload?,
        Err(e) => {
            warn!("Cache read failed for {key}: {e}");
            return None;
        }
    };

    match serde_json::from_str(&payload) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Discarding undecodable cache entry {key}: {e}");
            None
        }
    }
}

pub async fn save_json<T: Serialize + Sync>(
    cache: &dyn Cache,
    key: &str,
    value: &T,
    ttl: Duration,
) {
    let payload = match serde_json::to_string(value) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to encode cache entry {key}: {e}");
            return;
        }
    };

    if let Err(e) = cache.set(key, payload, ttl).await {
        warn!("Cache write failed for {key}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::BrokenCache;

    #[tokio::test]
    async fn test_json_helpers_round_trip() {
        let cache = MemoryCache::new();
        save_json(&cache, "k", &vec![1, 2, 3], Duration::from_secs(60)).await;

        let loaded: Option<Vec<i32>> = load_json(&cache, "k").await;
        assert_eq!(loaded, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_a_miss() {
        let cache = MemoryCache::new();
        cache
            .set("k", "not json".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let loaded: Option<Vec<i32>> = load_json(&cache, "k").await;
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn test_backend_failures_degrade_to_miss() {
        let cache = BrokenCache;
        save_json(&cache, "k", &42, Duration::from_secs(60)).await;

        let loaded: Option<i32> = load_json(&cache, "k").await;
        assert_eq!(loaded, None);
    }
}
