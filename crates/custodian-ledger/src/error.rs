use custodian_store::StoreError;

/// Coarse category of a [`LedgerError`], for callers that branch on the kind
/// of failure rather than its details.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Io,
    Integrity,
    Concurrency,
    Unavailable,
    Config,
}

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A required field is missing or malformed. Nothing was written.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The durable write failed. The tail was not advanced.
    #[error("durable write failed: {0}")]
    Io(#[source] StoreError),

    /// The chain state observed in the store is not what the coordinator
    /// expected.
    #[error("integrity violation: {reason}")]
    Integrity { reason: String },

    /// The append gate could not be acquired in time. Nothing was written.
    #[error("append gate busy for {waited_ms} ms")]
    Concurrency { waited_ms: u64 },

    /// A writer panicked while holding the append gate lock.
    #[error("append gate lock poisoned")]
    GatePoisoned,

    /// The store could not be read while answering a query.
    #[error("ledger unavailable: {0}")]
    Unavailable(#[source] StoreError),

    /// Opening or recovering the store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Io(_) | Self::Store(_) => ErrorKind::Io,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::Concurrency { .. } | Self::GatePoisoned => ErrorKind::Concurrency,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            LedgerError::validation("user_id", "must not be empty").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LedgerError::Concurrency { waited_ms: 5 }.kind(),
            ErrorKind::Concurrency
        );
        assert_eq!(LedgerError::GatePoisoned.kind(), ErrorKind::Concurrency);
        assert_eq!(LedgerError::Store(StoreError::Poisoned).kind(), ErrorKind::Io);
        assert_eq!(
            LedgerError::Unavailable(StoreError::Poisoned).kind(),
            ErrorKind::Unavailable
        );
    }

    #[test]
    fn display() {
        assert_eq!(
            LedgerError::validation("target", "must not be empty").to_string(),
            "invalid target: must not be empty"
        );
    }
}
