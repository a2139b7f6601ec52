//! Shared fixtures for the end-to-end scenarios

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use axon_config::{ProviderBudget, ProviderConfig, RepositoryConfig, RouterConfig};
use axon_router::{HandlerMap, ProviderError, ProviderHandler, RouteRequest};
use axon_state::StateRepository;
use axon_store::{DurableStore, MemoryCache, MemoryStore, StoreError, StoreTransaction};
use indexmap::IndexMap;
use jiff::Timestamp;
use serde_json::Value;

/// Install a log subscriber once so `RUST_LOG=debug` surfaces events
/// from failing scenarios
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Handler returning a fixed body, counting invocations
pub struct Scripted {
    body: Value,
    pub calls: AtomicU32,
}

impl Scripted {
    pub fn new(body: Value) -> Arc<Self> {
        Arc::new(Self {
            body,
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl ProviderHandler for Scripted {
    async fn invoke(&self, _request: &RouteRequest) -> Result<Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}

/// Handler that always reports an upstream failure
pub struct Failing;

#[async_trait]
impl ProviderHandler for Failing {
    async fn invoke(&self, _request: &RouteRequest) -> Result<Value, ProviderError> {
        Err(ProviderError::Failed("upstream 500".to_owned()))
    }
}

/// Handler that outlives every provider deadline in these tests
pub struct Hanging;

#[async_trait]
impl ProviderHandler for Hanging {
    async fn invoke(&self, _request: &RouteRequest) -> Result<Value, ProviderError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Value::Null)
    }
}

/// One provider entry with the weights the scenarios care about
pub fn provider(accuracy: f64, unit_cost: f64, failover: &[&str]) -> ProviderConfig {
    ProviderConfig {
        endpoint: "https://example.test/v1".to_owned(),
        api_key: None,
        latency_weight: 1.0,
        cost_weight: 1.0,
        accuracy_weight: accuracy,
        max_tokens: 8000,
        budget: ProviderBudget {
            unit_cost,
            latency: 120.0,
        },
        failover: failover.iter().map(|&s| s.to_owned()).collect(),
        timeout_seconds: 0.05,
    }
}

/// Standard three-provider table: openai, anthropic, local
pub fn standard_router_config() -> RouterConfig {
    let mut providers = IndexMap::new();
    providers.insert("openai".to_owned(), provider(0.9, 0.02, &[]));
    providers.insert("anthropic".to_owned(), provider(0.8, 0.018, &["openai"]));
    providers.insert("local".to_owned(), provider(0.1, 0.0, &["openai", "anthropic"]));
    RouterConfig {
        daily_cap: 450.0,
        monthly_cap: 12000.0,
        alert_threshold_percent: 80.0,
        providers,
    }
}

pub fn handlers(entries: Vec<(&str, Arc<dyn ProviderHandler>)>) -> HandlerMap {
    entries
        .into_iter()
        .map(|(name, handler)| (name.to_owned(), handler))
        .collect::<HashMap<_, _>>()
}

/// Repository over in-memory ports with fast retry backoff
pub fn repository(store: Arc<dyn DurableStore>) -> StateRepository {
    let config = RepositoryConfig {
        retry_initial_delay_ms: 1,
        ..RepositoryConfig::default()
    };
    StateRepository::new(Arc::new(MemoryCache::new()), store, &config)
}

/// Store decorator counting state-row writes
pub struct CountingStore {
    inner: MemoryStore,
    pub inserts: Arc<AtomicU32>,
    pub updates: Arc<AtomicU32>,
}

impl CountingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            inserts: Arc::new(AtomicU32::new(0)),
            updates: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl DurableStore for CountingStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        Ok(Box::new(CountingTransaction {
            inner: self.inner.begin().await?,
            inserts: Arc::clone(&self.inserts),
            updates: Arc::clone(&self.updates),
        }))
    }
}

struct CountingTransaction {
    inner: Box<dyn StoreTransaction>,
    inserts: Arc<AtomicU32>,
    updates: Arc<AtomicU32>,
}

#[async_trait]
impl StoreTransaction for CountingTransaction {
    async fn select_state(&mut self, session_id: &str) -> Result<Option<axon_store::StateRow>, StoreError> {
        self.inner.select_state(session_id).await
    }

    async fn state_exists(&mut self, session_id: &str) -> Result<bool, StoreError> {
        self.inner.state_exists(session_id).await
    }

    async fn insert_state(&mut self, row: axon_store::StateRow) -> Result<(), StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_state(row).await
    }

    async fn update_state(
        &mut self,
        session_id: &str,
        payload: Vec<u8>,
        payload_hash: String,
        version: i64,
        updated_at: Timestamp,
    ) -> Result<(), StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner
            .update_state(session_id, payload, payload_hash, version, updated_at)
            .await
    }

    async fn delete_state(&mut self, session_id: &str) -> Result<(), StoreError> {
        self.inner.delete_state(session_id).await
    }

    async fn purge_states_before(&mut self, threshold: Timestamp) -> Result<u64, StoreError> {
        self.inner.purge_states_before(threshold).await
    }

    async fn insert_ledger(
        &mut self,
        session_id: &str,
        payload: Vec<u8>,
        checksum: String,
        created_at: Timestamp,
    ) -> Result<axon_store::LedgerRow, StoreError> {
        self.inner.insert_ledger(session_id, payload, checksum, created_at).await
    }

    async fn select_ledger(&mut self, session_id: &str) -> Result<Vec<axon_store::LedgerRow>, StoreError> {
        self.inner.select_ledger(session_id).await
    }

    async fn mark_ledger_replayed(&mut self, ids: &[i64]) -> Result<(), StoreError> {
        self.inner.mark_ledger_replayed(ids).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.rollback().await
    }
}

/// Store decorator whose `begin` fails transiently a fixed number of times
pub struct FlakyStore {
    inner: MemoryStore,
    failures_left: AtomicU32,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore, failures: u32) -> Self {
        Self {
            inner,
            failures_left: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl DurableStore for FlakyStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Unavailable("injected connection loss".to_owned()));
        }
        self.inner.begin().await
    }
}
