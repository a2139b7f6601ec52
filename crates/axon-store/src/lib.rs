//! Storage ports for Axon: an expiring key/value cache and a
//! transactional durable store
//!
//! The repository and ledger crates talk to these traits only. The
//! durable store exposes typed row operations over the `session_state`
//! and `session_ledger` logical tables behind short-lived transactions;
//! the cache is a plain bytes-in/bytes-out TTL store. In-memory backends
//! ship for tests and local runs, and a Valkey/Redis cache backend for
//! deployments.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod cache;
pub mod durable;
mod error;
mod rows;

pub use cache::CacheStore;
pub use cache::memory::MemoryCache;
pub use cache::redis::RedisCache;
pub use durable::memory::MemoryStore;
pub use durable::{DurableStore, StoreTransaction};
pub use error::{CacheError, StoreError};
pub use rows::{LedgerRow, StateRow};
