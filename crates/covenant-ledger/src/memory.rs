use std::sync::RwLock;

use chrono::Utc;
use covenant_types::{AgentId, EventKind, TaskId};
use tracing::debug;

use crate::error::LedgerError;
use crate::event::{verify_chain, Event};
use crate::traits::{ChainIntegrity, EventLedger};

/// In-memory ledger backend used for tests, local demos, and embedding.
///
/// A single writer lock serializes appends; readers clone a consistent
/// snapshot of the already-durable prefix.
pub struct InMemoryLedger {
    inner: RwLock<Vec<Event>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(vec![Event::genesis()]),
        }
    }

    #[cfg(test)]
    pub(crate) fn tamper(&self, seq: u64, details: serde_json::Value) {
        let mut events = self.inner.write().unwrap();
        events[seq as usize].details = details;
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLedger for InMemoryLedger {
    fn append(
        &self,
        kind: EventKind,
        agent_id: &AgentId,
        task_id: Option<TaskId>,
        details: serde_json::Value,
    ) -> Result<Event, LedgerError> {
        let mut events = self.inner.write().map_err(|_| LedgerError::LockPoisoned)?;

        let tail = events.last().expect("chain always holds genesis");
        let event = Event::build(
            tail.seq + 1,
            kind,
            agent_id.clone(),
            task_id,
            Utc::now(),
            details,
            tail.hash,
        )?;

        events.push(event.clone());
        debug!(seq = event.seq, kind = %event.kind, agent = %event.agent_id, "event appended");
        Ok(event)
    }

    fn read_range(&self, from_seq: u64, to_seq: u64) -> Result<Vec<Event>, LedgerError> {
        if from_seq > to_seq {
            return Err(LedgerError::InvalidRange {
                from: from_seq,
                to: to_seq,
            });
        }

        let events = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        let start = from_seq as usize;
        if start >= events.len() {
            return Ok(vec![]);
        }
        let end_exclusive = ((to_seq + 1) as usize).min(events.len());
        Ok(events[start..end_exclusive].to_vec())
    }

    fn head_seq(&self) -> Result<u64, LedgerError> {
        let events = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(events.last().expect("chain always holds genesis").seq)
    }

    fn event_count(&self) -> Result<u64, LedgerError> {
        let events = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(events.len() as u64)
    }

    fn verify_chain_integrity(&self) -> Result<ChainIntegrity, LedgerError> {
        let events = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        verify_chain(&events)
    }
}
