use covenant_ledger::LedgerError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable admission denial codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasonCode {
    MissingOathAttributes,
    OathNotSworn,
    InvalidSignature,
    AlreadyRegistered,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::MissingOathAttributes => "MISSING_OATH_ATTRIBUTES",
            ReasonCode::OathNotSworn => "OATH_NOT_SWORN",
            ReasonCode::InvalidSignature => "INVALID_SIGNATURE",
            ReasonCode::AlreadyRegistered => "ALREADY_REGISTERED",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors from the admission gate. Fatal to the registration attempt,
/// never to the kernel.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("admission denied ({code}): {message}")]
    Denied { code: ReasonCode, message: String },

    #[error("ledger append failed during admission commit: {0}")]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl AdmissionError {
    pub fn denied(code: ReasonCode, message: impl Into<String>) -> Self {
        AdmissionError::Denied {
            code,
            message: message.into(),
        }
    }

    /// The denial code, when this is a denial.
    pub fn code(&self) -> Option<ReasonCode> {
        match self {
            AdmissionError::Denied { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Errors from the agent registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("agent registry lock poisoned")]
    LockPoisoned,
}
