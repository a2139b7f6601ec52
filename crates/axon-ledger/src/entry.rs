use axon_codec::CodecError;
use axon_store::LedgerRow;
use jiff::Timestamp;
use serde_json::Value;

/// An immutable, checksum-stamped ledger entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Serial id assigned by the store; strictly increases per append
    pub id: i64,
    pub session_id: String,
    /// Payload bytes exactly as stored
    pub payload: Vec<u8>,
    /// SHA-256 hex digest of `payload`
    pub checksum: String,
    pub created_at: Timestamp,
    /// Set once the replay engine has applied this entry
    pub replayed: bool,
}

impl LedgerEntry {
    /// Decode the payload bytes back into structured JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the stored bytes are not valid JSON
    pub fn decode(&self) -> Result<Value, CodecError> {
        axon_codec::decode_payload(&self.payload)
    }
}

impl From<LedgerRow> for LedgerEntry {
    fn from(row: LedgerRow) -> Self {
        Self {
            id: row.id,
            session_id: row.session_id,
            payload: row.payload,
            checksum: row.checksum,
            created_at: row.created_at,
            replayed: row.replayed,
        }
    }
}
