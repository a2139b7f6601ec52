use std::sync::Arc;

use axon_state::MAX_SESSION_ID_LEN;
use axon_store::DurableStore;
use jiff::Timestamp;
use serde_json::Value;

use crate::entry::LedgerEntry;
use crate::error::LedgerError;

/// Append-only ledger over the `session_ledger` table
pub struct SessionLedger {
    store: Arc<dyn DurableStore>,
}

impl SessionLedger {
    #[must_use]
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store }
    }

    /// Append a payload as a new ledger entry
    ///
    /// The payload is canonically encoded and checksummed before insert;
    /// the entry is created with `replayed = false`.
    ///
    /// # Errors
    ///
    /// Returns an error for an over-long session id, an encoding
    /// failure, or a durable failure
    pub async fn append(&self, session_id: &str, payload: &Value) -> Result<LedgerEntry, LedgerError> {
        if session_id.len() > MAX_SESSION_ID_LEN {
            return Err(LedgerError::SessionIdTooLong {
                len: session_id.len(),
                max: MAX_SESSION_ID_LEN,
            });
        }

        let bytes = axon_codec::canonical_bytes(payload)?;
        let checksum = axon_codec::hash_bytes(&bytes);

        let mut tx = self.store.begin().await?;
        let row = tx.insert_ledger(session_id, bytes, checksum, Timestamp::now()).await?;
        tx.commit().await?;

        tracing::debug!(session_id, id = row.id, "appended ledger entry");
        Ok(row.into())
    }

    /// Load all entries for a session, ordered by creation time
    ///
    /// Entries created at the same instant fall back to id order, so the
    /// result is a total order stable across repeated reads.
    ///
    /// # Errors
    ///
    /// Returns an error on durable failure
    pub async fn fetch_entries(&self, session_id: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut tx = self.store.begin().await?;
        let rows = tx.select_ledger(session_id).await?;
        tx.commit().await?;

        let mut entries: Vec<LedgerEntry> = rows.into_iter().map(Into::into).collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    /// Mark the given entries replayed in a single transaction
    ///
    /// An empty id list is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error on durable failure
    pub async fn mark_replayed(&self, ids: &[i64]) -> Result<(), LedgerError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut tx = self.store.begin().await?;
        tx.mark_ledger_replayed(ids).await?;
        tx.commit().await?;
        Ok(())
    }
}
