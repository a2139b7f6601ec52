use jiff::Timestamp;
use serde_json::Value;

/// Schema bound on session identifiers (`varchar(64)`)
pub const MAX_SESSION_ID_LEN: usize = 64;

/// A persisted session state record
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StateRecord {
    pub session_id: String,
    /// Structured payload as last saved
    pub payload: Value,
    /// SHA-256 hex digest of the payload's canonical encoding
    pub payload_hash: String,
    /// Starts at 1, bumped once per actual content change
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
