//! Covenant Ledger - append-only, hash-chained accountability record.
//!
//! This crate provides:
//! - the immutable [`Event`] record with BLAKE3 integrity hashing
//! - the [`EventLedger`] capability boundary (`append`, `read_range`,
//!   `verify_chain_integrity`)
//! - an in-memory backend for tests, demos, and embedding
//! - a durable JSON-lines backend with verify-on-open recovery
//! - a statistics projection over any backend
//!
//! Every state change in the kernel lands here; nothing is ever mutated or
//! deleted. Consumers reconstructing the chain must recompute each record's
//! hash before trusting it.

#![deny(unsafe_code)]

pub mod error;
pub mod event;
pub mod file;
pub mod memory;
pub mod projection;
pub mod traits;

pub use error::LedgerError;
pub use event::{verify_chain, Event};
pub use file::FileLedger;
pub use memory::InMemoryLedger;
pub use projection::LedgerStats;
pub use traits::{ChainIntegrity, EventLedger};

#[cfg(test)]
mod tests {
    use covenant_types::{AgentId, EventKind};

    use super::{ChainIntegrity, EventLedger, InMemoryLedger, LedgerStats};

    #[test]
    fn ledger_api_appends_and_projects() {
        let ledger = InMemoryLedger::new();
        let agent = AgentId::new("agent-a");

        ledger
            .append(EventKind::TaskSubmitted, &agent, None, serde_json::json!({}))
            .unwrap();
        ledger
            .append(EventKind::TaskStarted, &agent, None, serde_json::json!({}))
            .unwrap();

        assert_eq!(ledger.verify_chain_integrity().unwrap(), ChainIntegrity::Clean);

        let stats = LedgerStats::collect(&ledger).unwrap();
        assert_eq!(stats.total_events, 3); // genesis + 2
        assert_eq!(stats.by_kind.get("TASK_STARTED"), Some(&1));
    }
}
