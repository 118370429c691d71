use std::sync::Arc;

use covenant_judge::{InvariantJudge, ViolationRecord};
use covenant_ledger::EventLedger;
use covenant_types::{AgentId, EventKind, Severity};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::WatchdogError;
use crate::sink::ViolationSink;

/// Watchdog tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Verify every N scheduler cycles. Task-count based, so runs are
    /// deterministic under test.
    pub check_interval_cycles: u64,
    /// How many already-checked events to re-read ahead of the cursor so
    /// cross-event rules keep their context.
    pub context_window: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            check_interval_cycles: 10,
            context_window: 64,
        }
    }
}

/// Structured reason handed to the run-loop host when halting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HaltReason {
    pub rule: String,
    pub severity: Severity,
    pub offending_seqs: Vec<u64>,
    pub explanation: String,
}

impl HaltReason {
    fn from_violation(violation: &ViolationRecord) -> Self {
        Self {
            rule: violation.rule.clone(),
            severity: violation.severity,
            offending_seqs: violation.offending_seqs.clone(),
            explanation: violation.explanation.clone(),
        }
    }
}

/// Outcome of one watchdog tick.
#[derive(Clone, Debug)]
pub struct TickReport {
    pub should_halt: bool,
    pub halt_reason: Option<HaltReason>,
    pub new_violations: Vec<ViolationRecord>,
}

impl TickReport {
    fn quiet() -> Self {
        Self {
            should_halt: false,
            halt_reason: None,
            new_violations: Vec::new(),
        }
    }
}

pub type ViolationCallback = dyn Fn(&ViolationRecord) + Send + Sync;
pub type HaltCallback = dyn Fn(&HaltReason) + Send + Sync;

/// The runtime watchdog - drives the judge incrementally over the ledger.
pub struct RuntimeWatchdog {
    config: WatchdogConfig,
    judge: InvariantJudge,
    ledger: Arc<dyn EventLedger>,
    sinks: Vec<Box<dyn ViolationSink>>,
    on_violation: Vec<Box<ViolationCallback>>,
    on_halt: Vec<Box<HaltCallback>>,
    last_checked_seq: u64,
}

impl RuntimeWatchdog {
    pub fn new(judge: InvariantJudge, ledger: Arc<dyn EventLedger>, config: WatchdogConfig) -> Self {
        Self {
            config,
            judge,
            ledger,
            sinks: Vec::new(),
            on_violation: Vec::new(),
            on_halt: Vec::new(),
            last_checked_seq: 0,
        }
    }

    /// Attach a violation stream (file log, alerting bridge, ...).
    pub fn add_sink(&mut self, sink: Box<dyn ViolationSink>) {
        self.sinks.push(sink);
    }

    /// Observe every newly recorded violation without coupling to
    /// watchdog internals.
    pub fn on_violation(&mut self, callback: Box<ViolationCallback>) {
        self.on_violation.push(callback);
    }

    /// Observe halt escalation.
    pub fn on_halt(&mut self, callback: Box<HaltCallback>) {
        self.on_halt.push(callback);
    }

    /// Whether this cycle is a verification cycle.
    pub fn is_due(&self, cycle: u64) -> bool {
        cycle > 0 && cycle % self.config.check_interval_cycles == 0
    }

    pub fn last_checked_seq(&self) -> u64 {
        self.last_checked_seq
    }

    /// Verify the unseen tail of the ledger.
    ///
    /// Reads `[cursor - context_window, head]`, keeps only findings whose
    /// newest offending event lies beyond the cursor (older ones were
    /// reported by an earlier tick), persists them as `VIOLATION` events,
    /// and advances the cursor. The cursor never moves backward.
    pub fn tick(&mut self, cycle: u64) -> Result<TickReport, WatchdogError> {
        let head = self.ledger.head_seq()?;
        if head <= self.last_checked_seq {
            return Ok(TickReport::quiet());
        }

        let context_start = self.last_checked_seq.saturating_sub(self.config.context_window);
        let window = self.ledger.read_range(context_start, head)?;
        let report = self.judge.verify(&window);

        let cursor = self.last_checked_seq;
        let new_violations: Vec<ViolationRecord> = report
            .violations
            .into_iter()
            .filter(|v| {
                v.offending_seqs
                    .iter()
                    .copied()
                    .max()
                    .map(|newest| newest > cursor)
                    .unwrap_or(false)
            })
            .collect();

        for violation in &new_violations {
            self.ledger.append(
                EventKind::Violation,
                &AgentId::watchdog(),
                None,
                serde_json::to_value(violation)
                    .map_err(|e| WatchdogError::Sink(e.to_string()))?,
            )?;
            for sink in &self.sinks {
                sink.record(violation)?;
            }
            for callback in &self.on_violation {
                callback(violation);
            }
        }

        self.last_checked_seq = head;

        let halt_reason = new_violations
            .iter()
            .find(|v| v.severity.is_critical())
            .map(HaltReason::from_violation);
        let should_halt = halt_reason.is_some();

        if let Some(reason) = &halt_reason {
            warn!(
                cycle,
                rule = %reason.rule,
                "critical violation; requesting kernel halt"
            );
            for callback in &self.on_halt {
                callback(reason);
            }
        } else if !new_violations.is_empty() {
            info!(
                cycle,
                count = new_violations.len(),
                "non-critical violations recorded"
            );
        }

        Ok(TickReport {
            should_halt,
            halt_reason,
            new_violations,
        })
    }
}
