/// Errors from ledger store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A record failed its checksum or could not be decoded. Never repaired
    /// automatically.
    #[error("corrupt record at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// The segment holds damaged records, so nothing can be chained onto it.
    #[error("segment has {count} damaged record(s), first at offset {offset}; appends refused")]
    Damaged { offset: u64, count: usize },

    /// The segment file changed size behind the store's back.
    #[error("segment modified by another writer: expected {expected} bytes, found {actual}")]
    ForeignWrite { expected: u64, actual: u64 },

    /// Requested range extends past the published chain.
    #[error("range out of bounds: offset={offset}, count={count}, len={len}")]
    OutOfRange { offset: u64, count: u64, len: u64 },

    /// A thread panicked while holding a store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
