//! Deterministic replay of ledger entries into the state repository

use axon_state::StateRepository;
use serde::Serialize;

use crate::entry::LedgerEntry;
use crate::error::ReplayError;
use crate::ledger::SessionLedger;

/// Outcome of a batch replay
#[derive(Debug, Default, Serialize)]
pub struct ReplaySummary {
    /// Sessions replayed successfully, with applied entry counts
    pub replayed: Vec<SessionReplayed>,
    /// Sessions skipped, with the failure that stopped them
    pub skipped: Vec<SessionSkipped>,
}

#[derive(Debug, Serialize)]
pub struct SessionReplayed {
    pub session_id: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionSkipped {
    pub session_id: String,
    pub reason: String,
}

/// Reject entries that were already replayed
///
/// Callers use this as the pre-check for double replay before touching
/// the repository.
///
/// # Errors
///
/// Returns [`ReplayError::AlreadyReplayed`] for the first offending entry
pub fn ensure_idempotency(entries: &[LedgerEntry]) -> Result<(), ReplayError> {
    for entry in entries {
        if entry.replayed {
            return Err(ReplayError::AlreadyReplayed { id: entry.id });
        }
    }
    Ok(())
}

/// Rebuild a session's state by applying its ledger entries in order
///
/// Each entry is checked for double replay, its checksum re-verified
/// over the stored bytes, and its payload saved into the repository.
/// Entries are marked replayed only after the whole walk succeeds, so a
/// crash mid-replay leaves the unmarked tail to be reapplied on
/// recovery; reapplication is safe because saves are hash-idempotent.
///
/// # Errors
///
/// Returns the first per-entry failure (double replay, checksum
/// mismatch, undecodable payload) or any ledger/repository failure
pub async fn replay(
    ledger: &SessionLedger,
    repo: &StateRepository,
    session_id: &str,
) -> Result<Vec<LedgerEntry>, ReplayError> {
    let entries = ledger.fetch_entries(session_id).await?;
    let mut applied = Vec::with_capacity(entries.len());

    for entry in entries {
        if entry.replayed {
            return Err(ReplayError::AlreadyReplayed { id: entry.id });
        }
        if axon_codec::hash_bytes(&entry.payload) != entry.checksum {
            tracing::error!(session_id, id = entry.id, "ledger checksum mismatch");
            return Err(ReplayError::ChecksumMismatch { id: entry.id });
        }

        let payload = entry.decode().map_err(|source| ReplayError::UndecodablePayload {
            id: entry.id,
            source,
        })?;
        repo.save(session_id, &payload).await?;
        applied.push(entry);
    }

    let ids: Vec<i64> = applied.iter().map(|entry| entry.id).collect();
    ledger.mark_replayed(&ids).await?;

    tracing::info!(session_id, count = applied.len(), "replayed session");
    Ok(applied)
}

/// Replay several sessions, isolating failures per session
pub async fn replay_batch<I, S>(ledger: &SessionLedger, repo: &StateRepository, session_ids: I) -> ReplaySummary
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut summary = ReplaySummary::default();
    for session_id in session_ids {
        let session_id = session_id.as_ref();
        match replay(ledger, repo, session_id).await {
            Ok(applied) => summary.replayed.push(SessionReplayed {
                session_id: session_id.to_owned(),
                count: applied.len(),
            }),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "skipping session during batch replay");
                summary.skipped.push(SessionSkipped {
                    session_id: session_id.to_owned(),
                    reason: e.to_string(),
                });
            }
        }
    }
    summary
}
