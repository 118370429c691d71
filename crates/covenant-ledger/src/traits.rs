use covenant_types::{AgentId, EventKind, TaskId};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::event::Event;

/// Result of a full-chain integrity check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainIntegrity {
    Clean,
    Corrupted { seq: u64, reason: String },
}

impl ChainIntegrity {
    pub fn is_clean(&self) -> bool {
        matches!(self, ChainIntegrity::Clean)
    }
}

/// The single capability boundary every ledger backend implements.
///
/// Appends are atomic: an event is either fully durable with a correct hash
/// link, or not visible at all. Backends serialize writers so `prev_hash`
/// linkage is never ambiguous; reads run against a consistent snapshot.
pub trait EventLedger: Send + Sync {
    /// Append an event to the tail of the chain and return the stored record.
    fn append(
        &self,
        kind: EventKind,
        agent_id: &AgentId,
        task_id: Option<TaskId>,
        details: serde_json::Value,
    ) -> Result<Event, LedgerError>;

    /// Read the closed range `[from_seq, to_seq]`, clamped to the tail.
    fn read_range(&self, from_seq: u64, to_seq: u64) -> Result<Vec<Event>, LedgerError>;

    /// Read everything from `from_seq` through the tail.
    fn read_from(&self, from_seq: u64) -> Result<Vec<Event>, LedgerError> {
        let head = self.head_seq()?;
        if from_seq > head {
            return Ok(vec![]);
        }
        self.read_range(from_seq, head)
    }

    /// Sequence number of the newest record (genesis makes this >= 0).
    fn head_seq(&self) -> Result<u64, LedgerError>;

    /// Total number of records, genesis included.
    fn event_count(&self) -> Result<u64, LedgerError>;

    /// Recompute every hash from genesis and report the first mismatch.
    /// Side-effect free.
    fn verify_chain_integrity(&self) -> Result<ChainIntegrity, LedgerError>;
}
