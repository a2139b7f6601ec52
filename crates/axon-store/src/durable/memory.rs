use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::durable::{DurableStore, StoreTransaction};
use crate::error::StoreError;
use crate::rows::{LedgerRow, StateRow};

/// In-memory durable store
///
/// A transaction takes the table lock for its whole lifetime, mutates a
/// working copy, and publishes it on commit. Dropping a transaction
/// without committing discards all of its writes. The single lock is the
/// coarse equivalent of row locks: conflicting transactions serialize.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Clone, Default)]
struct Tables {
    states: BTreeMap<String, StateRow>,
    ledger: BTreeMap<i64, LedgerRow>,
    last_ledger_id: i64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn select_state(&mut self, session_id: &str) -> Result<Option<StateRow>, StoreError> {
        Ok(self.working.states.get(session_id).cloned())
    }

    async fn state_exists(&mut self, session_id: &str) -> Result<bool, StoreError> {
        Ok(self.working.states.contains_key(session_id))
    }

    async fn insert_state(&mut self, row: StateRow) -> Result<(), StoreError> {
        if self.working.states.contains_key(&row.session_id) {
            return Err(StoreError::Constraint(format!(
                "duplicate session_id: {}",
                row.session_id
            )));
        }
        self.working.states.insert(row.session_id.clone(), row);
        Ok(())
    }

    async fn update_state(
        &mut self,
        session_id: &str,
        payload: Vec<u8>,
        payload_hash: String,
        version: i64,
        updated_at: Timestamp,
    ) -> Result<(), StoreError> {
        if let Some(row) = self.working.states.get_mut(session_id) {
            row.payload = payload;
            row.payload_hash = payload_hash;
            row.version = version;
            row.updated_at = updated_at;
        }
        Ok(())
    }

    async fn delete_state(&mut self, session_id: &str) -> Result<(), StoreError> {
        self.working.states.remove(session_id);
        Ok(())
    }

    async fn purge_states_before(&mut self, threshold: Timestamp) -> Result<u64, StoreError> {
        let before = self.working.states.len();
        self.working.states.retain(|_, row| row.updated_at >= threshold);
        Ok(u64::try_from(before - self.working.states.len()).unwrap_or(u64::MAX))
    }

    async fn insert_ledger(
        &mut self,
        session_id: &str,
        payload: Vec<u8>,
        checksum: String,
        created_at: Timestamp,
    ) -> Result<LedgerRow, StoreError> {
        self.working.last_ledger_id += 1;
        let row = LedgerRow {
            id: self.working.last_ledger_id,
            session_id: session_id.to_owned(),
            payload,
            checksum,
            replayed: false,
            created_at,
        };
        self.working.ledger.insert(row.id, row.clone());
        Ok(row)
    }

    async fn select_ledger(&mut self, session_id: &str) -> Result<Vec<LedgerRow>, StoreError> {
        Ok(self
            .working
            .ledger
            .values()
            .filter(|row| row.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn mark_ledger_replayed(&mut self, ids: &[i64]) -> Result<(), StoreError> {
        for id in ids {
            if let Some(row) = self.working.ledger.get_mut(id) {
                row.replayed = true;
            }
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
