//! Transactional durable store port
//!
//! Typed row access over two logical tables:
//!
//! ```text
//! session_state(session_id PK, payload, payload_hash, version, created_at, updated_at)
//! session_ledger(id serial PK, session_id, payload, checksum, replayed, created_at)
//! ```
//!
//! All access happens inside a transaction obtained from [`DurableStore::begin`].
//! A transaction that is dropped without [`StoreTransaction::commit`] has no
//! observable effect.

use async_trait::async_trait;
use jiff::Timestamp;

use crate::error::StoreError;
use crate::rows::{LedgerRow, StateRow};

pub mod memory;

/// Handle to a transactional relational store
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Open a transaction; writes become visible only on commit
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// An open transaction over the session tables
///
/// The owning store serializes conflicting transactions (row locks or
/// coarser); callers hold transactions only for short, bounded work.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Load the full state row for a session
    async fn select_state(&mut self, session_id: &str) -> Result<Option<StateRow>, StoreError>;

    /// Single-column existence probe on `session_state`
    async fn state_exists(&mut self, session_id: &str) -> Result<bool, StoreError>;

    /// Insert a new state row; a duplicate key yields [`StoreError::Constraint`]
    async fn insert_state(&mut self, row: StateRow) -> Result<(), StoreError>;

    /// Overwrite payload, hash, version, and `updated_at` of an existing row
    async fn update_state(
        &mut self,
        session_id: &str,
        payload: Vec<u8>,
        payload_hash: String,
        version: i64,
        updated_at: Timestamp,
    ) -> Result<(), StoreError>;

    /// Delete a state row; deleting an absent row is not an error
    async fn delete_state(&mut self, session_id: &str) -> Result<(), StoreError>;

    /// Delete every state row with `updated_at` before the threshold,
    /// returning the number of rows removed
    async fn purge_states_before(&mut self, threshold: Timestamp) -> Result<u64, StoreError>;

    /// Append a ledger row, assigning the next serial id
    async fn insert_ledger(
        &mut self,
        session_id: &str,
        payload: Vec<u8>,
        checksum: String,
        created_at: Timestamp,
    ) -> Result<LedgerRow, StoreError>;

    /// Load all ledger rows for a session in id order
    async fn select_ledger(&mut self, session_id: &str) -> Result<Vec<LedgerRow>, StoreError>;

    /// Set `replayed = true` on the given ledger ids; unknown ids are ignored
    async fn mark_ledger_replayed(&mut self, ids: &[i64]) -> Result<(), StoreError>;

    /// Publish the transaction's writes
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard the transaction's writes
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
