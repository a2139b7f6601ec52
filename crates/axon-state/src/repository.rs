use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axon_config::RepositoryConfig;
use axon_store::{CacheStore, DurableStore, StateRow, StoreError};
use jiff::Timestamp;
use serde_json::Value;

use crate::error::RepositoryError;
use crate::record::{MAX_SESSION_ID_LEN, StateRecord};

/// Write-through repository coordinating the cache and durable ports
pub struct StateRepository {
    cache: Arc<dyn CacheStore>,
    store: Arc<dyn DurableStore>,
    cache_ttl: Duration,
    latency_sample_ttl: Duration,
    max_retries: u32,
    initial_backoff: Duration,
}

/// Cached record shape under `state:{session_id}`
///
/// The stored `hash` may go stale relative to the payload if a cache
/// entry survives odd failure interleavings, so readers recompute the
/// hash from the payload on load instead of trusting this field.
#[derive(serde::Serialize, serde::Deserialize)]
struct CachedState {
    payload: Value,
    hash: String,
    version: i64,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl StateRepository {
    #[must_use]
    pub fn new(cache: Arc<dyn CacheStore>, store: Arc<dyn DurableStore>, config: &RepositoryConfig) -> Self {
        Self {
            cache,
            store,
            cache_ttl: Duration::from_secs(config.cache_ttl_seconds),
            latency_sample_ttl: Duration::from_secs(config.latency_sample_ttl_seconds),
            max_retries: config.max_retries.max(1),
            initial_backoff: Duration::from_millis(config.retry_initial_delay_ms),
        }
    }

    /// Persist a session payload, bumping the version only on change
    ///
    /// The read-modify-write runs in a single transaction: a new session
    /// inserts version 1, an unchanged payload hash leaves the row
    /// untouched, anything else rewrites payload and hash with
    /// version + 1. The committed record is then written through to the
    /// cache (best effort).
    ///
    /// # Errors
    ///
    /// Returns an error for an over-long session id, an encoding
    /// failure, or a durable failure that survived the retry budget
    pub async fn save(&self, session_id: &str, payload: &Value) -> Result<StateRecord, RepositoryError> {
        check_session_id(session_id)?;
        let bytes = axon_codec::canonical_bytes(payload)?;
        let hash = axon_codec::hash_bytes(&bytes);

        let (version, created_at, updated_at) = self
            .retry("save", || self.save_once(session_id, &bytes, &hash))
            .await?;

        let record = StateRecord {
            session_id: session_id.to_owned(),
            payload: payload.clone(),
            payload_hash: hash,
            version,
            created_at,
            updated_at,
        };
        self.cache_record(&record).await;
        Ok(record)
    }

    /// Fetch a session record, preferring the cache
    ///
    /// A cache hit refreshes the TTL. A miss falls through to the
    /// durable store and writes the result back into the cache. Reads
    /// never fault the caller: retry exhaustion is logged and surfaces
    /// as `None`.
    pub async fn get(&self, session_id: &str) -> Option<StateRecord> {
        if let Some(record) = self.load_from_cache(session_id).await {
            tracing::debug!(session_id, "cache hit");
            self.cache_record(&record).await;
            return Some(record);
        }

        let row = match self.retry("get", || self.load_once(session_id)).await {
            Ok(row) => row?,
            Err(e) => {
                tracing::warn!(session_id, error = %e, "durable read failed, treating session as absent");
                return None;
            }
        };

        let record = row_to_record(row)?;
        self.cache_record(&record).await;
        Some(record)
    }

    /// Remove a session from cache and durable store
    ///
    /// Idempotent: deleting an absent session succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable delete exhausts its retries
    pub async fn delete(&self, session_id: &str) -> Result<(), RepositoryError> {
        if let Err(e) = self.cache.delete(&state_key(session_id)).await {
            tracing::warn!(session_id, error = %e, "cache delete failed, continuing with durable delete");
        }
        self.retry("delete", || self.delete_once(session_id)).await
    }

    /// Verify the stored payload still matches its recorded hash
    ///
    /// Missing sessions are reported as `false` rather than an error so
    /// callers can decide remediation.
    pub async fn validate_integrity(&self, session_id: &str) -> bool {
        let Some(record) = self.get(session_id).await else {
            return false;
        };
        match axon_codec::hash_payload(&record.payload) {
            Ok(computed) if computed == record.payload_hash => true,
            Ok(_) => {
                tracing::warn!(session_id, "integrity drift detected");
                false
            }
            Err(e) => {
                tracing::error!(session_id, error = %e, "payload could not be re-encoded for validation");
                false
            }
        }
    }

    /// Extend the cache TTL for an active session; no durable write
    pub async fn touch(&self, session_id: &str, ttl_extension: Option<Duration>) {
        let ttl = ttl_extension.unwrap_or(self.cache_ttl);
        if let Err(e) = self.cache.expire(&state_key(session_id), ttl).await {
            tracing::warn!(session_id, error = %e, "failed to extend cache TTL");
        }
    }

    /// Whether a session exists in the cache or the durable store
    ///
    /// Like `get`, this never faults the caller; failures read as
    /// `false`.
    pub async fn session_exists(&self, session_id: &str) -> bool {
        match self.cache.exists(&state_key(session_id)).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => {
                tracing::debug!(session_id, error = %e, "cache existence probe failed, falling back to store");
            }
        }

        match self.retry("exists", || self.exists_once(session_id)).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(session_id, error = %e, "durable existence probe failed");
                false
            }
        }
    }

    /// Delete every session not updated since the threshold
    ///
    /// Cache entries for purged sessions are left to expire naturally.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable purge exhausts its retries
    pub async fn purge_stale(&self, threshold: Timestamp) -> Result<u64, RepositoryError> {
        let purged = self.retry("purge", || self.purge_once(threshold)).await?;
        if purged > 0 {
            tracing::info!(purged, %threshold, "purged stale session state");
        }
        Ok(purged)
    }

    /// Record a cache latency observability sample
    ///
    /// Written under `state:latency:{session_id}` with a short TTL.
    /// Sink errors never propagate to the caller.
    pub async fn record_cache_latency(&self, session_id: &str, latency_ms: f64) {
        let body = match serde_json::to_vec(&serde_json::json!({ "latency_ms": latency_ms })) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(session_id, error = %e, "failed to encode latency sample");
                return;
            }
        };
        let key = format!("state:latency:{session_id}");
        if let Err(e) = self.cache.setex(&key, self.latency_sample_ttl, &body).await {
            tracing::error!(session_id, error = %e, "failed to record cache latency sample");
        }
    }

    // -- durable single attempts --

    async fn save_once(
        &self,
        session_id: &str,
        bytes: &[u8],
        hash: &str,
    ) -> Result<(i64, Timestamp, Timestamp), StoreError> {
        let mut tx = self.store.begin().await?;
        let now = Timestamp::now();

        let outcome = match tx.select_state(session_id).await? {
            None => {
                tx.insert_state(StateRow {
                    session_id: session_id.to_owned(),
                    payload: bytes.to_vec(),
                    payload_hash: hash.to_owned(),
                    version: 1,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
                (1, now, now)
            }
            Some(row) if row.payload_hash == hash => {
                tracing::debug!(session_id, version = row.version, "payload unchanged, no-op save");
                (row.version, row.created_at, row.updated_at)
            }
            Some(row) => {
                let version = row.version + 1;
                tx.update_state(session_id, bytes.to_vec(), hash.to_owned(), version, now)
                    .await?;
                (version, row.created_at, now)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn load_once(&self, session_id: &str) -> Result<Option<StateRow>, StoreError> {
        let mut tx = self.store.begin().await?;
        let row = tx.select_state(session_id).await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn delete_once(&self, session_id: &str) -> Result<(), StoreError> {
        let mut tx = self.store.begin().await?;
        tx.delete_state(session_id).await?;
        tx.commit().await
    }

    async fn exists_once(&self, session_id: &str) -> Result<bool, StoreError> {
        let mut tx = self.store.begin().await?;
        let found = tx.state_exists(session_id).await?;
        tx.commit().await?;
        Ok(found)
    }

    async fn purge_once(&self, threshold: Timestamp) -> Result<u64, StoreError> {
        let mut tx = self.store.begin().await?;
        let purged = tx.purge_states_before(threshold).await?;
        tx.commit().await?;
        Ok(purged)
    }

    // -- cache plumbing --

    async fn cache_record(&self, record: &StateRecord) {
        let cached = CachedState {
            payload: record.payload.clone(),
            hash: record.payload_hash.clone(),
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        };
        let bytes = match serde_json::to_vec(&cached) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(session_id = %record.session_id, error = %e, "failed to encode cache record");
                return;
            }
        };
        if let Err(e) = self
            .cache
            .setex(&state_key(&record.session_id), self.cache_ttl, &bytes)
            .await
        {
            tracing::warn!(session_id = %record.session_id, error = %e, "cache write failed");
        }
    }

    async fn load_from_cache(&self, session_id: &str) -> Option<StateRecord> {
        let key = state_key(session_id);
        let bytes = match self.cache.get(&key).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                tracing::warn!(session_id, error = %e, "cache read failed");
                return None;
            }
        };

        let cached: CachedState = match serde_json::from_slice(&bytes) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::error!(session_id, error = %e, "dropping undecodable cache entry");
                if let Err(e) = self.cache.delete(&key).await {
                    tracing::warn!(session_id, error = %e, "failed to drop cache entry");
                }
                return None;
            }
        };

        // Recompute rather than trust the cached hash so integrity checks
        // cannot fail from cache-side drift
        let payload_hash = axon_codec::hash_payload(&cached.payload).ok()?;
        Some(StateRecord {
            session_id: session_id.to_owned(),
            payload: cached.payload,
            payload_hash,
            version: cached.version,
            created_at: cached.created_at,
            updated_at: cached.updated_at,
        })
    }

    // -- retry loop --

    async fn retry<T, F, Fut>(&self, context: &'static str, mut op: F) -> Result<T, RepositoryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut delay = self.initial_backoff;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        context,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "transient durable error"
                    );
                    if attempt >= self.max_retries {
                        return Err(RepositoryError::RetriesExhausted {
                            context,
                            attempts: attempt,
                            source: e,
                        });
                    }
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(RepositoryError::Store(e)),
            }
        }
    }
}

fn state_key(session_id: &str) -> String {
    format!("state:{session_id}")
}

fn check_session_id(session_id: &str) -> Result<(), RepositoryError> {
    if session_id.len() > MAX_SESSION_ID_LEN {
        return Err(RepositoryError::SessionIdTooLong {
            len: session_id.len(),
        });
    }
    Ok(())
}

fn row_to_record(row: StateRow) -> Option<StateRecord> {
    match axon_codec::decode_payload(&row.payload) {
        Ok(payload) => Some(StateRecord {
            session_id: row.session_id,
            payload,
            payload_hash: row.payload_hash,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }),
        Err(e) => {
            tracing::error!(session_id = %row.session_id, error = %e, "stored payload is undecodable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use axon_store::{MemoryCache, MemoryStore, StoreTransaction};
    use serde_json::json;

    use super::*;

    fn test_config() -> RepositoryConfig {
        RepositoryConfig {
            retry_initial_delay_ms: 1,
            ..RepositoryConfig::default()
        }
    }

    fn repo_with(store: Arc<dyn DurableStore>) -> StateRepository {
        StateRepository::new(Arc::new(MemoryCache::new()), store, &test_config())
    }

    fn repo() -> (StateRepository, MemoryStore) {
        let store = MemoryStore::new();
        (repo_with(Arc::new(store.clone())), store)
    }

    /// Store decorator whose `begin` fails transiently a fixed number of times
    struct FlakyStore {
        inner: MemoryStore,
        failures_left: AtomicU32,
    }

    #[async_trait::async_trait]
    impl DurableStore for FlakyStore {
        async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::Unavailable("injected".to_owned()));
            }
            self.inner.begin().await
        }
    }

    #[tokio::test]
    async fn first_save_creates_version_one() {
        let (repo, _) = repo();
        let record = repo.save("s1", &json!({"a": 1})).await.unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.created_at, record.updated_at);
    }

    #[tokio::test]
    async fn unchanged_payload_is_a_noop_save() {
        let (repo, _) = repo();
        let first = repo.save("s1", &json!({"a": 1})).await.unwrap();
        let second = repo.save("s1", &json!({"a": 1})).await.unwrap();
        assert_eq!(second.version, 1);
        assert_eq!(second.updated_at, first.updated_at);
    }

    #[tokio::test]
    async fn changed_payload_bumps_version() {
        let (repo, _) = repo();
        repo.save("s1", &json!({"a": 1})).await.unwrap();
        let updated = repo.save("s1", &json!({"a": 2})).await.unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.payload, json!({"a": 2}));
    }

    #[tokio::test]
    async fn get_round_trips_through_cache_and_store() {
        let (repo, _) = repo();
        repo.save("s1", &json!({"a": 1})).await.unwrap();

        // Cache hit
        let record = repo.get("s1").await.unwrap();
        assert_eq!(record.payload, json!({"a": 1}));

        // Cache miss falls back to the store
        repo.cache.delete("state:s1").await.unwrap();
        let record = repo.get("s1").await.unwrap();
        assert_eq!(record.version, 1);

        // And writes through, so the cache is warm again
        assert!(repo.cache.exists("state:s1").await.unwrap());
    }

    #[tokio::test]
    async fn get_missing_session_is_none() {
        let (repo, _) = repo();
        assert!(repo.get("absent").await.is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (repo, _) = repo();
        repo.save("s1", &json!({"a": 1})).await.unwrap();
        repo.delete("s1").await.unwrap();
        repo.delete("s1").await.unwrap();
        assert!(repo.get("s1").await.is_none());
        assert!(!repo.session_exists("s1").await);
    }

    #[tokio::test]
    async fn validate_integrity_on_clean_and_missing_sessions() {
        let (repo, _) = repo();
        repo.save("s1", &json!({"a": 1})).await.unwrap();
        assert!(repo.validate_integrity("s1").await);
        assert!(!repo.validate_integrity("absent").await);
    }

    #[tokio::test]
    async fn validate_integrity_detects_durable_tampering() {
        let (repo, store) = repo();
        repo.save("s1", &json!({"a": 1})).await.unwrap();

        // Rewrite the payload without touching the stored hash
        let mut tx = store.begin().await.unwrap();
        let row = tx.select_state("s1").await.unwrap().unwrap();
        tx.update_state("s1", b"{\"a\":999}".to_vec(), row.payload_hash, row.version, row.updated_at)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        // Bypass the cache so the tampered row is read
        repo.cache.delete("state:s1").await.unwrap();
        assert!(!repo.validate_integrity("s1").await);
    }

    #[tokio::test]
    async fn stale_cached_hash_does_not_fail_validation() {
        let (repo, _) = repo();
        let record = repo.save("s1", &json!({"a": 1})).await.unwrap();

        // Poison the cached hash; the payload itself is intact
        let cached = CachedState {
            payload: record.payload.clone(),
            hash: "0".repeat(64),
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        };
        repo.cache
            .setex("state:s1", Duration::from_secs(60), &serde_json::to_vec(&cached).unwrap())
            .await
            .unwrap();

        assert!(repo.validate_integrity("s1").await);
    }

    #[tokio::test]
    async fn undecodable_cache_entry_is_dropped_and_store_wins() {
        let (repo, _) = repo();
        repo.save("s1", &json!({"a": 1})).await.unwrap();
        repo.cache
            .setex("state:s1", Duration::from_secs(60), b"garbage")
            .await
            .unwrap();

        let record = repo.get("s1").await.unwrap();
        assert_eq!(record.payload, json!({"a": 1}));
    }

    #[tokio::test]
    async fn session_exists_checks_cache_then_store() {
        let (repo, _) = repo();
        repo.save("s1", &json!({"a": 1})).await.unwrap();
        assert!(repo.session_exists("s1").await);

        repo.cache.delete("state:s1").await.unwrap();
        assert!(repo.session_exists("s1").await);
        assert!(!repo.session_exists("other").await);
    }

    #[tokio::test]
    async fn purge_stale_removes_old_rows_and_reports_count() {
        let (repo, _) = repo();
        repo.save("old", &json!({"a": 1})).await.unwrap();
        repo.save("new", &json!({"b": 2})).await.unwrap();

        // Everything is newer than a past threshold
        let past = Timestamp::from_second(Timestamp::now().as_second() - 3600).unwrap();
        assert_eq!(repo.purge_stale(past).await.unwrap(), 0);

        // Everything is older than a future threshold
        let future = Timestamp::from_second(Timestamp::now().as_second() + 3600).unwrap();
        assert_eq!(repo.purge_stale(future).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn touch_extends_cache_ttl_only() {
        let (repo, store) = repo();
        repo.save("s1", &json!({"a": 1})).await.unwrap();
        let before = {
            let mut tx = store.begin().await.unwrap();
            tx.select_state("s1").await.unwrap().unwrap()
        };

        repo.touch("s1", Some(Duration::from_secs(600))).await;

        let after = {
            let mut tx = store.begin().await.unwrap();
            tx.select_state("s1").await.unwrap().unwrap()
        };
        assert_eq!(before, after);
        assert!(repo.cache.exists("state:s1").await.unwrap());
    }

    #[tokio::test]
    async fn record_cache_latency_writes_sample() {
        let (repo, _) = repo();
        repo.record_cache_latency("s1", 12.5).await;
        let sample = repo.cache.get("state:latency:s1").await.unwrap().unwrap();
        let value: Value = serde_json::from_slice(&sample).unwrap();
        assert!((value["latency_ms"].as_f64().unwrap() - 12.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn transient_failures_below_budget_are_retried() {
        let flaky = FlakyStore {
            inner: MemoryStore::new(),
            failures_left: AtomicU32::new(2),
        };
        let repo = repo_with(Arc::new(flaky));
        let record = repo.save("s1", &json!({"a": 1})).await.unwrap();
        assert_eq!(record.version, 1);
    }

    #[tokio::test]
    async fn retry_exhaustion_surfaces_on_save_but_not_get() {
        let flaky = FlakyStore {
            inner: MemoryStore::new(),
            failures_left: AtomicU32::new(100),
        };
        let repo = repo_with(Arc::new(flaky));

        let err = repo.save("s1", &json!({"a": 1})).await.unwrap_err();
        assert!(matches!(err, RepositoryError::RetriesExhausted { attempts: 3, .. }));

        // Reads swallow exhaustion
        assert!(repo.get("s1").await.is_none());
        assert!(!repo.session_exists("s1").await);
    }

    #[tokio::test]
    async fn overlong_session_id_is_rejected() {
        let (repo, _) = repo();
        let id = "x".repeat(MAX_SESSION_ID_LEN + 1);
        let err = repo.save(&id, &json!({})).await.unwrap_err();
        assert!(matches!(err, RepositoryError::SessionIdTooLong { len: 65 }));
    }
}
