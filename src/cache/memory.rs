use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, info};
use regex::Regex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::Cache;
use crate::errors::CacheError;

struct CacheEntry {
    payload: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Process-local TTL cache on a concurrent map.
///
/// Expired entries are dropped when read, and in bulk by [`purge_expired`].
///
/// [`purge_expired`]: MemoryCache::purge_expired
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.entries.len())
    }

    /// Purges expired entries every `interval` until `shutdown` flips to `true`.
    pub fn spawn_purge_task(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Cache purge task stopped");
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let purged = cache.purge_expired();
                        if purged > 0 {
                            debug!("Purged {purged} expired cache entries");
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let found = self
            .entries
            .get(key)
            .map(|entry| (!entry.is_expired()).then(|| entry.payload.clone()));

        match found {
            Some(Some(payload)) => Ok(Some(payload)),
            Some(None) => {
                self.entries.remove_if(key, |_, entry| entry.is_expired());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry {
            payload: value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let regex = glob_to_regex(pattern)?;
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| regex.is_match(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        for key in &doomed {
            self.entries.remove(key);
        }

        debug!("Invalidated {} cache entries matching {pattern}", doomed.len());
        Ok(doomed.len() as u64)
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex, CacheError> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');

    Regex::new(&source)
        .map_err(|e| CacheError::Backend(format!("invalid pattern {pattern:?}: {e}")))
}
