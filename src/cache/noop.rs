use std::time::Duration;

use async_trait::async_trait;

use super::Cache;
use crate::errors::CacheError;

/// Stores nothing; every read is a miss. Used when caching is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _keys: &[String]) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
        Ok(0)
    }
}
