use covenant_ledger::Event;
use tracing::{debug, error};

use crate::rules::{
    ApprovalBeforeTransfer, InvariantRule, LicenseBeforeBroadcast, MonotonicTime, NoDuplicates,
    NoOrphanedEvents, WorkflowOrdering,
};
use crate::violation::{LedgerSnapshot, VerificationReport, ViolationRecord};

/// The invariant judge - replays an event window through every registered
/// rule and collects all violations in a single pass.
pub struct InvariantJudge {
    rules: Vec<Box<dyn InvariantRule>>,
}

impl InvariantJudge {
    /// An empty judge; rules must be registered before it is useful.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// A judge loaded with the six standard rules.
    pub fn with_standard_rules() -> Self {
        let mut judge = Self::new();
        judge.register(Box::new(LicenseBeforeBroadcast));
        judge.register(Box::new(ApprovalBeforeTransfer));
        judge.register(Box::new(NoOrphanedEvents));
        judge.register(Box::new(MonotonicTime));
        judge.register(Box::new(NoDuplicates));
        judge.register(Box::new(WorkflowOrdering));
        judge
    }

    /// Add a rule without touching existing ones.
    pub fn register(&mut self, rule: Box<dyn InvariantRule>) {
        debug!(rule = rule.name(), severity = %rule.severity(), "invariant rule registered");
        self.rules.push(rule);
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Evaluate every rule over the given ordered window.
    ///
    /// Kernel bookkeeping records (genesis, violations, halts) are not
    /// agent behavior and are excluded from rule input. Violations are
    /// collected, never short-circuited.
    pub fn verify(&self, events: &[Event]) -> VerificationReport {
        let behavior: Vec<Event> = events
            .iter()
            .filter(|e| !e.kind.is_bookkeeping())
            .cloned()
            .collect();

        let mut violations = Vec::new();
        for rule in &self.rules {
            for finding in rule.check(&behavior) {
                error!(
                    rule = rule.name(),
                    severity = %rule.severity(),
                    offending = ?finding.offending_seqs,
                    "invariant violation"
                );
                let count = violations.len() as u64 + 1;
                violations.push(ViolationRecord {
                    rule: rule.name().to_string(),
                    severity: rule.severity(),
                    offending_seqs: finding.offending_seqs,
                    explanation: finding.explanation,
                    snapshot: LedgerSnapshot {
                        events_seen: events.len() as u64,
                        violations_so_far: count,
                    },
                });
            }
        }

        VerificationReport {
            passed: violations.is_empty(),
            violations,
        }
    }
}

impl Default for InvariantJudge {
    fn default() -> Self {
        Self::new()
    }
}
