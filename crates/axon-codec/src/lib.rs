//! Canonical payload encoding and content hashing
//!
//! Session payloads are hashed over a deterministic, key-sorted JSON
//! encoding so that logically equal payloads produce identical digests
//! regardless of the order keys were inserted or which process did the
//! encoding. The ledger additionally checksums raw payload bytes as
//! stored, so both forms are exposed here.

use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload could not be serialized to canonical JSON
    #[error("encode: {0}")]
    Encode(String),
    /// Stored bytes could not be decoded back into a payload
    #[error("decode: {0}")]
    Decode(String),
}

/// Encode a payload into canonical JSON bytes
///
/// Object keys are sorted recursively before serialization, so the
/// output is independent of insertion order at every nesting level.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized (non-finite
/// numbers injected through a custom `Number`, for example)
pub fn canonical_bytes(payload: &Value) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(&canonicalize(payload)).map_err(|e| CodecError::Encode(e.to_string()))
}

/// SHA-256 hex digest of a payload's canonical encoding
///
/// # Errors
///
/// Returns an error if canonical encoding fails
pub fn hash_payload(payload: &Value) -> Result<String, CodecError> {
    Ok(hash_bytes(&canonical_bytes(payload)?))
}

/// SHA-256 hex digest of raw bytes
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    format!("{hash:x}")
}

/// Decode stored payload bytes back into structured JSON
///
/// # Errors
///
/// Returns an error if the bytes are not valid JSON
pub fn decode_payload(bytes: &[u8]) -> Result<Value, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Rebuild a value with object keys in sorted order at every level
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let payload = json!({"step": 1, "agent": "planner"});
        assert_eq!(hash_payload(&payload).unwrap(), hash_payload(&payload).unwrap());
    }

    #[test]
    fn hash_ignores_key_insertion_order() {
        let a: Value = serde_json::from_str(r#"{"a": 1, "b": {"x": true, "y": null}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b": {"y": null, "x": true}, "a": 1}"#).unwrap();
        assert_eq!(hash_payload(&a).unwrap(), hash_payload(&b).unwrap());
    }

    #[test]
    fn hash_differs_for_different_payloads() {
        let a = json!({"step": 1});
        let b = json!({"step": 2});
        assert_ne!(hash_payload(&a).unwrap(), hash_payload(&b).unwrap());
    }

    #[test]
    fn array_order_is_significant() {
        let a = json!({"steps": [1, 2]});
        let b = json!({"steps": [2, 1]});
        assert_ne!(hash_payload(&a).unwrap(), hash_payload(&b).unwrap());
    }

    #[test]
    fn hash_bytes_known_vector() {
        // SHA-256 of the empty input
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn canonical_roundtrip() {
        let payload = json!({"nested": {"list": [1, "two", {"three": 3.0}]}, "flag": false});
        let bytes = canonical_bytes(&payload).unwrap();
        assert_eq!(decode_payload(&bytes).unwrap(), payload);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_payload(b"not json").is_err());
    }
}
