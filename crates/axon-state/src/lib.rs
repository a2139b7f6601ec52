//! Distributed session state repository
//!
//! A write-through cache over the durable store port. The durable store
//! is the source of truth; the cache is a hot read path with TTL expiry.
//! Every payload is content-addressed with a SHA-256 hash over its
//! canonical encoding, and saves are hash-idempotent: an unchanged
//! payload never bumps the stored version.

mod error;
mod record;
mod repository;

pub use error::RepositoryError;
pub use record::{MAX_SESSION_ID_LEN, StateRecord};
pub use repository::StateRepository;
