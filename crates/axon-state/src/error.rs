use axon_codec::CodecError;
use axon_store::StoreError;
use thiserror::Error;

use crate::record::MAX_SESSION_ID_LEN;

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Session ids are bounded by the schema's `varchar(64)`
    #[error("session id is {len} chars, limit is {MAX_SESSION_ID_LEN}")]
    SessionIdTooLong { len: usize },

    /// A durable operation kept failing transiently until the retry
    /// budget ran out
    #[error("{context} failed after {attempts} attempts")]
    RetriesExhausted {
        context: &'static str,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// A durable operation failed with a non-transient error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Payload could not be encoded or decoded
    #[error(transparent)]
    Codec(#[from] CodecError),
}
