//! Expiring key/value cache port

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

pub mod memory;
pub mod redis;

/// Expiring key/value cache with opaque byte values
///
/// All writes carry a TTL (`setex` semantics); there is no plain `set`.
/// Keys are namespaced by the caller.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a value, or `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a value with a TTL, replacing any existing entry
    async fn setex(&self, key: &str, ttl: Duration, value: &[u8]) -> Result<(), CacheError>;

    /// Remove a key; removing an absent key is not an error
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Reset the TTL of an existing key
    ///
    /// Returns `false` when the key does not exist (or already expired),
    /// mirroring the EXPIRE command.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;

    /// Whether a live entry exists for the key
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
}
