use std::collections::HashMap;

use chrono::{DateTime, Utc};
use covenant_ledger::Event;
use covenant_types::{EventKind, Severity, TaskId};

/// One rule's complaint about a specific spot in the stream.
#[derive(Clone, Debug)]
pub struct RuleFinding {
    pub offending_seqs: Vec<u64>,
    pub explanation: String,
}

/// A named, versioned predicate over the event stream.
///
/// Rules are pure: they inspect the events they are handed and return
/// findings, nothing else. The judge owns wrapping findings into
/// persistable violation records.
pub trait InvariantRule: Send + Sync {
    fn name(&self) -> &str;
    fn version(&self) -> u32 {
        1
    }
    fn severity(&self) -> Severity;
    fn description(&self) -> &str;
    fn check(&self, events: &[Event]) -> Vec<RuleFinding>;
}

/// Find, per task, whether `required` occurred strictly before `target`.
///
/// Shared skeleton of the three ordering rules: publish-after-license,
/// transfer-after-approval, vote-after-proposal.
fn require_precedent(
    events: &[Event],
    target: EventKind,
    required: EventKind,
    explain: impl Fn(&Event) -> String,
) -> Vec<RuleFinding> {
    let mut findings = Vec::new();
    let mut satisfied: HashMap<TaskId, u64> = HashMap::new();

    for event in events {
        let Some(task_id) = event.task_id else {
            continue;
        };
        if event.kind == required {
            satisfied.entry(task_id).or_insert(event.seq);
        } else if event.kind == target && !satisfied.contains_key(&task_id) {
            findings.push(RuleFinding {
                offending_seqs: vec![event.seq],
                explanation: explain(event),
            });
        }
    }

    findings
}

/// Any privileged publish event must be preceded, within the same task,
/// by a successful license grant.
pub struct LicenseBeforeBroadcast;

impl InvariantRule for LicenseBeforeBroadcast {
    fn name(&self) -> &str {
        "license-before-broadcast"
    }
    fn severity(&self) -> Severity {
        Severity::Critical
    }
    fn description(&self) -> &str {
        "CONTENT_PUBLISHED requires a prior LICENSE_GRANTED in the same task"
    }
    fn check(&self, events: &[Event]) -> Vec<RuleFinding> {
        require_precedent(
            events,
            EventKind::ContentPublished,
            EventKind::LicenseGranted,
            |event| {
                format!(
                    "agent {} published in task {} with no prior license grant",
                    event.agent_id,
                    event.task_id.expect("target events carry a task"),
                )
            },
        )
    }
}

/// Any resource transfer must be preceded by a passed proposal for the
/// same task.
pub struct ApprovalBeforeTransfer;

impl InvariantRule for ApprovalBeforeTransfer {
    fn name(&self) -> &str {
        "approval-before-transfer"
    }
    fn severity(&self) -> Severity {
        Severity::Critical
    }
    fn description(&self) -> &str {
        "RESOURCE_TRANSFERRED requires a prior PROPOSAL_PASSED in the same task"
    }
    fn check(&self, events: &[Event]) -> Vec<RuleFinding> {
        require_precedent(
            events,
            EventKind::ResourceTransferred,
            EventKind::ProposalPassed,
            |event| {
                format!(
                    "agent {} transferred resources in task {} with no passed proposal",
                    event.agent_id,
                    event.task_id.expect("target events carry a task"),
                )
            },
        )
    }
}

/// Every event carries a usable type, agent identity, and timestamp.
pub struct NoOrphanedEvents;

impl InvariantRule for NoOrphanedEvents {
    fn name(&self) -> &str {
        "no-orphaned-events"
    }
    fn severity(&self) -> Severity {
        Severity::High
    }
    fn description(&self) -> &str {
        "every event has a non-empty type, agent id, and timestamp"
    }
    fn check(&self, events: &[Event]) -> Vec<RuleFinding> {
        events
            .iter()
            .filter(|event| event.agent_id.0.trim().is_empty())
            .map(|event| RuleFinding {
                offending_seqs: vec![event.seq],
                explanation: format!("event {} has an empty agent id", event.seq),
            })
            .collect()
    }
}

/// Within a task, time never runs backwards.
pub struct MonotonicTime;

impl InvariantRule for MonotonicTime {
    fn name(&self) -> &str {
        "monotonic-time"
    }
    fn severity(&self) -> Severity {
        Severity::High
    }
    fn description(&self) -> &str {
        "events within the same task are non-decreasing in timestamp"
    }
    fn check(&self, events: &[Event]) -> Vec<RuleFinding> {
        let mut findings = Vec::new();
        let mut last_per_task: HashMap<TaskId, (u64, DateTime<Utc>)> = HashMap::new();

        for event in events {
            let Some(task_id) = event.task_id else {
                continue;
            };
            if let Some(&(prev_seq, prev_ts)) = last_per_task.get(&task_id) {
                if event.timestamp < prev_ts {
                    findings.push(RuleFinding {
                        offending_seqs: vec![prev_seq, event.seq],
                        explanation: format!(
                            "task {} event {} is timestamped before event {}",
                            task_id, event.seq, prev_seq
                        ),
                    });
                }
            }
            last_per_task.insert(task_id, (event.seq, event.timestamp));
        }

        findings
    }
}

/// No two events share (task, type, timestamp) exactly.
pub struct NoDuplicates;

impl InvariantRule for NoDuplicates {
    fn name(&self) -> &str {
        "no-duplicates"
    }
    fn severity(&self) -> Severity {
        Severity::Critical
    }
    fn description(&self) -> &str {
        "no two events share (task id, type, timestamp)"
    }
    fn check(&self, events: &[Event]) -> Vec<RuleFinding> {
        let mut findings = Vec::new();
        let mut seen: HashMap<(Option<TaskId>, EventKind, DateTime<Utc>), u64> = HashMap::new();

        for event in events {
            let key = (event.task_id, event.kind, event.timestamp);
            match seen.get(&key) {
                Some(&first_seq) => findings.push(RuleFinding {
                    offending_seqs: vec![first_seq, event.seq],
                    explanation: format!(
                        "event {} duplicates event {} ({}, same task and timestamp)",
                        event.seq, first_seq, event.kind
                    ),
                }),
                None => {
                    seen.insert(key, event.seq);
                }
            }
        }

        findings
    }
}

/// A recorded vote presupposes the proposal it votes on.
pub struct WorkflowOrdering;

impl InvariantRule for WorkflowOrdering {
    fn name(&self) -> &str {
        "workflow-ordering"
    }
    fn severity(&self) -> Severity {
        Severity::High
    }
    fn description(&self) -> &str {
        "VOTE_RECORDED requires a prior PROPOSAL_CREATED in the same task"
    }
    fn check(&self, events: &[Event]) -> Vec<RuleFinding> {
        require_precedent(
            events,
            EventKind::VoteRecorded,
            EventKind::ProposalCreated,
            |event| {
                format!(
                    "vote recorded in task {} before any proposal was created",
                    event.task_id.expect("target events carry a task"),
                )
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use covenant_types::{AgentId, Hash};

    use super::*;

    fn event(seq: u64, kind: EventKind, task: Option<TaskId>, ts: DateTime<Utc>) -> Event {
        Event::build(
            seq,
            kind,
            AgentId::new("agent-a"),
            task,
            ts,
            serde_json::json!({}),
            Hash::ZERO,
        )
        .unwrap()
    }

    #[test]
    fn publish_without_license_is_found() {
        let task = TaskId::new();
        let now = Utc::now();
        let events = vec![event(1, EventKind::ContentPublished, Some(task), now)];

        let findings = LicenseBeforeBroadcast.check(&events);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].offending_seqs, vec![1]);
    }

    #[test]
    fn license_then_publish_is_clean() {
        let task = TaskId::new();
        let now = Utc::now();
        let events = vec![
            event(1, EventKind::LicenseGranted, Some(task), now),
            event(2, EventKind::ContentPublished, Some(task), now + TimeDelta::seconds(1)),
        ];

        assert!(LicenseBeforeBroadcast.check(&events).is_empty());
    }

    #[test]
    fn license_in_another_task_does_not_count() {
        let now = Utc::now();
        let events = vec![
            event(1, EventKind::LicenseGranted, Some(TaskId::new()), now),
            event(2, EventKind::ContentPublished, Some(TaskId::new()), now),
        ];

        assert_eq!(LicenseBeforeBroadcast.check(&events).len(), 1);
    }

    #[test]
    fn transfer_without_passed_proposal_is_found() {
        let task = TaskId::new();
        let now = Utc::now();
        let events = vec![
            event(1, EventKind::ProposalCreated, Some(task), now),
            event(2, EventKind::ResourceTransferred, Some(task), now + TimeDelta::seconds(1)),
        ];

        // Created but never passed.
        assert_eq!(ApprovalBeforeTransfer.check(&events).len(), 1);
    }

    #[test]
    fn empty_agent_id_is_orphaned() {
        let mut e = event(1, EventKind::TaskStarted, Some(TaskId::new()), Utc::now());
        e.agent_id = AgentId::new("  ");
        assert_eq!(NoOrphanedEvents.check(&[e]).len(), 1);
    }

    #[test]
    fn backwards_timestamp_within_task_is_found() {
        let task = TaskId::new();
        let now = Utc::now();
        let events = vec![
            event(1, EventKind::TaskStarted, Some(task), now),
            event(2, EventKind::TaskCompleted, Some(task), now - TimeDelta::seconds(5)),
        ];

        let findings = MonotonicTime.check(&events);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].offending_seqs, vec![1, 2]);
    }

    #[test]
    fn timestamps_across_tasks_are_independent() {
        let now = Utc::now();
        let events = vec![
            event(1, EventKind::TaskStarted, Some(TaskId::new()), now),
            event(2, EventKind::TaskStarted, Some(TaskId::new()), now - TimeDelta::seconds(5)),
        ];

        assert!(MonotonicTime.check(&events).is_empty());
    }

    #[test]
    fn exact_duplicates_are_found() {
        let task = TaskId::new();
        let now = Utc::now();
        let events = vec![
            event(1, EventKind::TaskStarted, Some(task), now),
            event(2, EventKind::TaskStarted, Some(task), now),
        ];

        let findings = NoDuplicates.check(&events);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].offending_seqs, vec![1, 2]);
    }

    #[test]
    fn vote_before_proposal_is_found() {
        let task = TaskId::new();
        let now = Utc::now();
        let events = vec![event(1, EventKind::VoteRecorded, Some(task), now)];

        assert_eq!(WorkflowOrdering.check(&events).len(), 1);
    }

    #[test]
    fn proposal_then_vote_is_clean() {
        let task = TaskId::new();
        let now = Utc::now();
        let events = vec![
            event(1, EventKind::ProposalCreated, Some(task), now),
            event(2, EventKind::VoteRecorded, Some(task), now + TimeDelta::seconds(1)),
        ];

        assert!(WorkflowOrdering.check(&events).is_empty());
    }
}
