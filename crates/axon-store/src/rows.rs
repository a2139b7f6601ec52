use jiff::Timestamp;

/// A row of the `session_state` table
///
/// `payload` holds the canonical encoding of the session payload and
/// `payload_hash` its SHA-256 hex digest. `version` starts at 1 and is
/// bumped once per actual content change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRow {
    pub session_id: String,
    pub payload: Vec<u8>,
    pub payload_hash: String,
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row of the append-only `session_ledger` table
///
/// `checksum` is the SHA-256 hex digest of `payload` exactly as stored.
/// `id` is assigned by the store and strictly increases per append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub id: i64,
    pub session_id: String,
    pub payload: Vec<u8>,
    pub checksum: String,
    pub replayed: bool,
    pub created_at: Timestamp,
}
