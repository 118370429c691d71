use chrono::{DateTime, Utc};
use covenant_types::{AgentId, EventKind, Hash, TaskId};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::traits::ChainIntegrity;

/// A ledger event - the atomic unit of state change in the kernel.
///
/// Events are immutable once appended. Each event links to its predecessor
/// through `prev_hash` and carries its own BLAKE3 hash computed over every
/// other field, so any retroactive edit breaks the chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    /// Monotonically increasing position in the chain (genesis is 0).
    pub seq: u64,
    pub kind: EventKind,
    pub agent_id: AgentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub timestamp: DateTime<Utc>,
    /// Free-form payload, serialized deterministically as part of the hash.
    pub details: serde_json::Value,
    /// Hash of the preceding event (zero for genesis).
    pub prev_hash: Hash,
    /// BLAKE3 hash of this record with `hash` itself zeroed.
    pub hash: Hash,
}

impl Event {
    /// Build an event at the given chain position and compute its hash.
    pub fn build(
        seq: u64,
        kind: EventKind,
        agent_id: AgentId,
        task_id: Option<TaskId>,
        timestamp: DateTime<Utc>,
        details: serde_json::Value,
        prev_hash: Hash,
    ) -> Result<Self, LedgerError> {
        let mut event = Self {
            seq,
            kind,
            agent_id,
            task_id,
            timestamp,
            details,
            prev_hash,
            hash: Hash::ZERO,
        };
        event.hash = event.compute_hash()?;
        Ok(event)
    }

    /// The fixed first record of every chain.
    pub fn genesis() -> Self {
        Event::build(
            0,
            EventKind::Genesis,
            AgentId::kernel(),
            None,
            DateTime::UNIX_EPOCH,
            serde_json::json!({ "chain": "covenant-ledger-v1" }),
            Hash::ZERO,
        )
        .expect("genesis record is statically well-formed")
    }

    /// Recompute this event's hash from its canonical encoding.
    pub fn compute_hash(&self) -> Result<Hash, LedgerError> {
        let mut canonical = self.clone();
        canonical.hash = Hash::ZERO;

        let encoded = serde_json::to_vec(&canonical)?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"covenant-event-v1:");
        hasher.update(&encoded);
        Ok(Hash::from_bytes(*hasher.finalize().as_bytes()))
    }

    /// True when the stored hash matches the recomputed one.
    pub fn verify_integrity(&self) -> bool {
        self.compute_hash()
            .map(|expected| expected == self.hash)
            .unwrap_or(false)
    }
}

/// Walk an ordered event slice from genesis and report the first break.
///
/// Checks, per event: sequence contiguity, prev-hash linkage, and the
/// recomputed record hash. Never mutates anything.
pub fn verify_chain(events: &[Event]) -> Result<ChainIntegrity, LedgerError> {
    let Some(genesis) = events.first() else {
        return Ok(ChainIntegrity::Corrupted {
            seq: 0,
            reason: "chain is empty; genesis record missing".to_string(),
        });
    };

    if genesis.seq != 0 || genesis.kind != EventKind::Genesis || !genesis.prev_hash.is_zero() {
        return Ok(ChainIntegrity::Corrupted {
            seq: genesis.seq,
            reason: "first record is not a well-formed genesis event".to_string(),
        });
    }

    for (index, event) in events.iter().enumerate() {
        if event.seq != index as u64 {
            return Ok(ChainIntegrity::Corrupted {
                seq: event.seq,
                reason: format!("expected seq {}, found {}", index, event.seq),
            });
        }

        if index > 0 && event.prev_hash != events[index - 1].hash {
            return Ok(ChainIntegrity::Corrupted {
                seq: event.seq,
                reason: "previous hash link mismatch".to_string(),
            });
        }

        let computed = event.compute_hash()?;
        if computed != event.hash {
            return Ok(ChainIntegrity::Corrupted {
                seq: event.seq,
                reason: "record hash mismatch".to_string(),
            });
        }
    }

    Ok(ChainIntegrity::Clean)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chained(count: usize) -> Vec<Event> {
        let mut events = vec![Event::genesis()];
        for i in 1..=count {
            let prev = events.last().unwrap();
            events.push(
                Event::build(
                    prev.seq + 1,
                    EventKind::TaskSubmitted,
                    AgentId::new("agent-a"),
                    Some(TaskId::new()),
                    Utc::now(),
                    serde_json::json!({ "n": i }),
                    prev.hash,
                )
                .unwrap(),
            );
        }
        events
    }

    #[test]
    fn genesis_is_deterministic() {
        assert_eq!(Event::genesis().hash, Event::genesis().hash);
        assert!(Event::genesis().prev_hash.is_zero());
    }

    #[test]
    fn event_hash_verifies() {
        let events = chained(1);
        assert!(events[1].verify_integrity());
    }

    #[test]
    fn tampered_details_fail_integrity() {
        let mut events = chained(1);
        events[1].details = serde_json::json!({ "n": 999 });
        assert!(!events[1].verify_integrity());
    }

    #[test]
    fn clean_chain_verifies() {
        let events = chained(5);
        assert_eq!(verify_chain(&events).unwrap(), ChainIntegrity::Clean);
    }

    #[test]
    fn broken_link_reported_at_offending_seq() {
        let mut events = chained(5);
        events[3].details = serde_json::json!({ "edited": true });
        // Re-hash so only the link (not the record hash) is broken downstream.
        events[3].hash = events[3].compute_hash().unwrap();

        let result = verify_chain(&events).unwrap();
        assert_eq!(
            result,
            ChainIntegrity::Corrupted {
                seq: 4,
                reason: "previous hash link mismatch".to_string()
            }
        );
    }

    #[test]
    fn payload_edit_reported_at_offending_seq() {
        let mut events = chained(5);
        events[2].details = serde_json::json!({ "edited": true });

        match verify_chain(&events).unwrap() {
            ChainIntegrity::Corrupted { seq, reason } => {
                assert_eq!(seq, 2);
                assert_eq!(reason, "record hash mismatch");
            }
            ChainIntegrity::Clean => panic!("tampered chain reported clean"),
        }
    }

    #[test]
    fn missing_genesis_is_corruption() {
        let events = chained(2);
        let result = verify_chain(&events[1..]).unwrap();
        assert!(matches!(result, ChainIntegrity::Corrupted { .. }));
    }
}
