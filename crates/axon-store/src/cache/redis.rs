use std::time::Duration;

use async_trait::async_trait;

use crate::cache::CacheStore;
use crate::error::CacheError;

/// Valkey/Redis-backed cache
///
/// Values are stored verbatim as byte strings with `SET .. EX` TTLs; a
/// multiplexed async connection is established per command batch.
#[derive(Clone)]
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    /// Create a cache from a connection URL
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid
    pub fn new(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|e| CacheError::Backend(format!("invalid URL: {e}")))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Backend(format!("connection failed: {e}")))
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        use redis::AsyncCommands;

        let mut conn = self.connection().await?;
        conn.get(key)
            .await
            .map_err(|e| CacheError::Backend(format!("GET failed: {e}")))
    }

    async fn setex(&self, key: &str, ttl: Duration, value: &[u8]) -> Result<(), CacheError> {
        use redis::AsyncCommands;

        let mut conn = self.connection().await?;
        let ttl_secs = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .map_err(|e| CacheError::Backend(format!("SET failed: {e}")))?;

        tracing::debug!(key, ttl_secs, "cached value");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        use redis::AsyncCommands;

        let mut conn = self.connection().await?;
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| CacheError::Backend(format!("DEL failed: {e}")))?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        use redis::AsyncCommands;

        let mut conn = self.connection().await?;
        let secs = i64::try_from(ttl.as_secs().max(1)).unwrap_or(i64::MAX);
        conn.expire(key, secs)
            .await
            .map_err(|e| CacheError::Backend(format!("EXPIRE failed: {e}")))
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        use redis::AsyncCommands;

        let mut conn = self.connection().await?;
        conn.exists(key)
            .await
            .map_err(|e| CacheError::Backend(format!("EXISTS failed: {e}")))
    }
}
