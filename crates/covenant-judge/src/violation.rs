use covenant_types::Severity;
use serde::{Deserialize, Serialize};

/// Ledger position summary captured when a violation is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Events the verification pass had in view.
    pub events_seen: u64,
    /// Violations produced so far in this pass, this one included.
    pub violations_so_far: u64,
}

/// A failed invariant, ready to be persisted as a `VIOLATION` event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub rule: String,
    pub severity: Severity,
    /// Ledger sequence numbers of the events that break the rule.
    pub offending_seqs: Vec<u64>,
    pub explanation: String,
    pub snapshot: LedgerSnapshot,
}

/// Outcome of one verification pass over an event window.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Logical AND over all registered rules.
    pub passed: bool,
    pub violations: Vec<ViolationRecord>,
}

impl VerificationReport {
    pub fn has_critical(&self) -> bool {
        self.violations.iter().any(|v| v.severity.is_critical())
    }
}
