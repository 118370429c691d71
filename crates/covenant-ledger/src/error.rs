use thiserror::Error;

/// Errors returned by ledger backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The backing store rejected the write; the sequence did not advance
    /// and the record is not visible. Callers retry, never ignore.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid range: from_seq {from} is greater than to_seq {to}")]
    InvalidRange { from: u64, to: u64 },

    #[error("chain integrity violation at seq {seq}: {reason}")]
    IntegrityViolation { seq: u64, reason: String },

    #[error("ledger lock poisoned")]
    LockPoisoned,
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(error: serde_json::Error) -> Self {
        LedgerError::Serialization(error.to_string())
    }
}
