use thiserror::Error;

/// Durable store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection to the backing store was lost or refused
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backing store detected a deadlock and aborted the transaction
    #[error("deadlock: {0}")]
    Deadlock(String),

    /// A uniqueness or integrity constraint rejected the write
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Any other backend failure
    #[error("store backend: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether retrying the enclosing operation may succeed
    ///
    /// Deadlocks, dropped connections, and constraint violations (which
    /// can result from a concurrent writer racing the same row) are all
    /// worth retrying.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Deadlock(_) | Self::Constraint(_))
    }
}

/// Cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// Connection or command failure against the cache backend
    #[error("cache backend: {0}")]
    Backend(String),
}
