use axon_codec::CodecError;
use axon_state::RepositoryError;
use axon_store::StoreError;
use thiserror::Error;

/// Ledger access errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Session ids are bounded by the schema's `varchar(64)`
    #[error("session id is {len} chars, limit is {max}")]
    SessionIdTooLong { len: usize, max: usize },

    /// The durable store rejected the operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Payload could not be canonically encoded
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Replay failures
///
/// Checksum and double-replay failures are per-entry and abort the
/// session's replay at that entry; batch replay reports them as skips.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The entry was already replayed; applying it again would double-count
    #[error("ledger entry {id} already replayed")]
    AlreadyReplayed { id: i64 },

    /// Stored payload bytes no longer match the entry's checksum
    #[error("checksum mismatch on ledger entry {id}")]
    ChecksumMismatch { id: i64 },

    /// Entry payload bytes are not decodable JSON
    #[error("undecodable payload on ledger entry {id}: {source}")]
    UndecodablePayload {
        id: i64,
        #[source]
        source: CodecError,
    },

    /// Ledger access failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Applying an entry to the repository failed
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
