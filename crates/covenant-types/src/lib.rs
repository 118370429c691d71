//! Covenant Types - shared vocabulary of the governance kernel
#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Identity of a worker agent. Stable for the agent's lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);
impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Reserved identity the kernel itself writes under (genesis, halts).
    pub fn kernel() -> Self {
        Self("kernel".to_string())
    }

    /// Reserved identity the watchdog writes violation events under.
    pub fn watchdog() -> Self {
        Self("watchdog".to_string())
    }
}
impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a unit of work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub uuid::Uuid);
impl TaskId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}
impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}
impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// BLAKE3 hash wrapper.
///
/// Serializes as a fixed-length (64 character) lowercase hex string so that
/// persisted records carry their hashes in human-auditable form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for b in &self.0 {
            out.push_str(&format!("{:02x}", b));
        }
        out
    }

    pub fn from_hex(hex: &str) -> Result<Self, HashParseError> {
        if hex.len() != 64 {
            return Err(HashParseError::BadLength(hex.len()));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).map_err(|_| HashParseError::BadDigit)?;
            bytes[i] = u8::from_str_radix(pair, 16).map_err(|_| HashParseError::BadDigit)?;
        }
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash({})", self)
    }
}

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in &self.0[..8] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "...")
    }
}

impl Serialize for Hash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Hash::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HashParseError {
    #[error("hash hex must be 64 characters, got {0}")]
    BadLength(usize),
    #[error("hash hex contains a non-hex digit")]
    BadDigit,
}

/// Severity of an invariant violation.
///
/// Ordered from most to least severe; only `Critical` findings may halt
/// the kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn is_critical(&self) -> bool {
        matches!(self, Severity::Critical)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        };
        write!(f, "{}", label)
    }
}

/// Classification of ledger events.
///
/// Serialized SCREAMING_SNAKE_CASE so persisted records read as the wire
/// vocabulary (`AGENT_REGISTERED`, `TASK_STARTED`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Fixed first record of every chain.
    Genesis,
    AgentRegistered,
    TaskSubmitted,
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    TaskBlocked,
    TaskUnblocked,
    LicenseGranted,
    ContentPublished,
    ProposalCreated,
    ProposalPassed,
    VoteRecorded,
    ResourceTransferred,
    /// An invariant violation recorded by the watchdog.
    Violation,
    KernelHalted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Genesis => "GENESIS",
            EventKind::AgentRegistered => "AGENT_REGISTERED",
            EventKind::TaskSubmitted => "TASK_SUBMITTED",
            EventKind::TaskStarted => "TASK_STARTED",
            EventKind::TaskCompleted => "TASK_COMPLETED",
            EventKind::TaskFailed => "TASK_FAILED",
            EventKind::TaskBlocked => "TASK_BLOCKED",
            EventKind::TaskUnblocked => "TASK_UNBLOCKED",
            EventKind::LicenseGranted => "LICENSE_GRANTED",
            EventKind::ContentPublished => "CONTENT_PUBLISHED",
            EventKind::ProposalCreated => "PROPOSAL_CREATED",
            EventKind::ProposalPassed => "PROPOSAL_PASSED",
            EventKind::VoteRecorded => "VOTE_RECORDED",
            EventKind::ResourceTransferred => "RESOURCE_TRANSFERRED",
            EventKind::Violation => "VIOLATION",
            EventKind::KernelHalted => "KERNEL_HALTED",
        }
    }

    /// Kernel bookkeeping kinds are exempt from invariant evaluation.
    pub fn is_bookkeeping(&self) -> bool {
        matches!(
            self,
            EventKind::Genesis | EventKind::Violation | EventKind::KernelHalted
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
