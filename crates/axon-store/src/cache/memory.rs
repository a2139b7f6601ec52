use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::cache::CacheStore;
use crate::error::CacheError;

/// In-memory cache with per-entry expiry
///
/// Entries are evicted lazily: an expired entry is removed the next time
/// it is read. Suitable for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the entry if it has expired; returns whether a live entry remains
    fn prune(&self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                drop(entry);
                self.entries.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        if !self.prune(key) {
            return Ok(None);
        }
        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn setex(&self, key: &str, ttl: Duration, value: &[u8]) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_owned(),
            Entry {
                value: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        if !self.prune(key) {
            return Ok(false);
        }
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Instant::now() + ttl;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.prune(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get() {
        let cache = MemoryCache::new();
        cache.setex("k", Duration::from_secs(60), b"v").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert!(cache.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("absent").await.unwrap(), None);
        assert!(!cache.exists("absent").await.unwrap());
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache = MemoryCache::new();
        cache.setex("k", Duration::from_millis(10), b"v").await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expire_extends_ttl() {
        let cache = MemoryCache::new();
        cache.setex("k", Duration::from_millis(20), b"v").await.unwrap();
        assert!(cache.expire("k", Duration::from_secs(60)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn expire_on_missing_key_is_false() {
        let cache = MemoryCache::new();
        assert!(!cache.expire("absent", Duration::from_secs(1)).await.unwrap());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let cache = MemoryCache::new();
        cache.setex("k", Duration::from_secs(60), b"v").await.unwrap();
        cache.delete("k").await.unwrap();
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
