//! Append-only session ledger and deterministic replay
//!
//! Every session-affecting event is appended as an immutable,
//! checksum-stamped entry. Replay walks a session's entries in creation
//! order, re-verifies each checksum, and applies the payloads to the
//! state repository, marking entries replayed only after they applied.

mod entry;
mod error;
mod ledger;
pub mod replay;

pub use entry::LedgerEntry;
pub use error::{LedgerError, ReplayError};
pub use ledger::SessionLedger;
pub use replay::{ReplaySummary, SessionReplayed, SessionSkipped, ensure_idempotency, replay, replay_batch};
