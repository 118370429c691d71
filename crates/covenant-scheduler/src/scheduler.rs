use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use covenant_gate::AgentRegistry;
use covenant_ledger::EventLedger;
use covenant_types::{AgentId, EventKind, TaskId};
use tracing::{debug, info};

use crate::error::SchedulerError;
use crate::task::{Task, TaskStatus};

/// Predicate restricting which task kinds are eligible in the current
/// operating cycle. The policy itself lives outside the kernel; the
/// scheduler only consults it.
pub type EligibilityFn = dyn Fn(&Task) -> bool + Send + Sync;

/// The task scheduler - holds the queue, assigns work to admitted agents,
/// and records every transition to the ledger.
pub struct TaskScheduler {
    tasks: HashMap<TaskId, Task>,
    registry: Arc<AgentRegistry>,
    ledger: Arc<dyn EventLedger>,
    eligibility: Option<Box<EligibilityFn>>,
}

impl TaskScheduler {
    pub fn new(registry: Arc<AgentRegistry>, ledger: Arc<dyn EventLedger>) -> Self {
        Self {
            tasks: HashMap::new(),
            registry,
            ledger,
            eligibility: None,
        }
    }

    /// Install the cycle-policy predicate. Absent a predicate, every kind
    /// is eligible.
    pub fn set_eligibility(&mut self, predicate: Box<EligibilityFn>) {
        self.eligibility = Some(predicate);
    }

    /// Accept a task into the queue.
    pub fn submit(&mut self, task: Task) -> Result<TaskId, SchedulerError> {
        let id = task.id;
        self.ledger.append(
            EventKind::TaskSubmitted,
            &AgentId::kernel(),
            Some(id),
            serde_json::json!({ "kind": task.kind, "priority": task.priority }),
        )?;

        debug!(task = %id, kind = %task.kind, "task submitted");
        self.tasks.insert(id, task);
        Ok(id)
    }

    /// The highest-priority pending task whose kind the current cycle
    /// allows; FIFO within a priority class. Never returns terminal tasks.
    pub fn next(&self) -> Option<Task> {
        self.tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending)
            .filter(|t| self.eligibility.as_ref().map(|e| e(t)).unwrap_or(true))
            .min_by_key(|t| (Reverse(t.priority), t.created_at, t.id.0.as_u128()))
            .cloned()
    }

    /// Hand a pending task to an agent.
    ///
    /// Refused outright when the target agent is not admitted at this
    /// instant, independent of the gate having already run.
    pub fn dispatch(&mut self, task_id: TaskId, agent_id: &AgentId) -> Result<Task, SchedulerError> {
        if !self.registry.is_admitted(agent_id)? {
            return Err(SchedulerError::AgentNotAdmitted(agent_id.clone()));
        }

        let task = self
            .tasks
            .get(&task_id)
            .ok_or(SchedulerError::TaskNotFound(task_id))?;
        ensure_transition(task, TaskStatus::InProgress)?;

        self.ledger.append(
            EventKind::TaskStarted,
            agent_id,
            Some(task_id),
            serde_json::json!({ "kind": task.kind }),
        )?;

        let task = self.tasks.get_mut(&task_id).expect("checked above");
        task.status = TaskStatus::InProgress;
        task.assignee = Some(agent_id.clone());
        task.started_at = Some(Utc::now());

        info!(task = %task_id, agent = %agent_id, "task dispatched");
        Ok(task.clone())
    }

    /// Record a successful outcome.
    pub fn complete(
        &mut self,
        task_id: TaskId,
        result: serde_json::Value,
    ) -> Result<(), SchedulerError> {
        let task = self
            .tasks
            .get(&task_id)
            .ok_or(SchedulerError::TaskNotFound(task_id))?;
        ensure_transition(task, TaskStatus::Completed)?;

        let actor = task.assignee.clone().unwrap_or_else(AgentId::kernel);
        self.ledger.append(
            EventKind::TaskCompleted,
            &actor,
            Some(task_id),
            serde_json::json!({ "result": result }),
        )?;

        let task = self.tasks.get_mut(&task_id).expect("checked above");
        task.status = TaskStatus::Completed;
        task.completed_at = Some(Utc::now());
        task.result = Some(result);

        info!(task = %task_id, "task completed");
        Ok(())
    }

    /// Record a failure outcome.
    pub fn fail(&mut self, task_id: TaskId, error: impl Into<String>) -> Result<(), SchedulerError> {
        let task = self
            .tasks
            .get(&task_id)
            .ok_or(SchedulerError::TaskNotFound(task_id))?;
        ensure_transition(task, TaskStatus::Failed)?;

        let error = error.into();
        let actor = task.assignee.clone().unwrap_or_else(AgentId::kernel);
        self.ledger.append(
            EventKind::TaskFailed,
            &actor,
            Some(task_id),
            serde_json::json!({ "error": error }),
        )?;

        let task = self.tasks.get_mut(&task_id).expect("checked above");
        task.status = TaskStatus::Failed;
        task.completed_at = Some(Utc::now());
        task.error = Some(error);

        info!(task = %task_id, "task failed");
        Ok(())
    }

    /// Park a pending task on an external dependency.
    pub fn block(&mut self, task_id: TaskId, reason: impl Into<String>) -> Result<(), SchedulerError> {
        let task = self
            .tasks
            .get(&task_id)
            .ok_or(SchedulerError::TaskNotFound(task_id))?;
        ensure_transition(task, TaskStatus::Blocked)?;

        self.ledger.append(
            EventKind::TaskBlocked,
            &AgentId::kernel(),
            Some(task_id),
            serde_json::json!({ "reason": reason.into() }),
        )?;

        self.tasks.get_mut(&task_id).expect("checked above").status = TaskStatus::Blocked;
        Ok(())
    }

    /// Return a blocked task to the queue.
    pub fn unblock(&mut self, task_id: TaskId) -> Result<(), SchedulerError> {
        let task = self
            .tasks
            .get(&task_id)
            .ok_or(SchedulerError::TaskNotFound(task_id))?;
        ensure_transition(task, TaskStatus::Pending)?;

        self.ledger.append(
            EventKind::TaskUnblocked,
            &AgentId::kernel(),
            Some(task_id),
            serde_json::json!({}),
        )?;

        self.tasks.get_mut(&task_id).expect("checked above").status = TaskStatus::Pending;
        Ok(())
    }

    pub fn get(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn pending_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending)
            .count()
    }
}

fn ensure_transition(task: &Task, to: TaskStatus) -> Result<(), SchedulerError> {
    if !task.status.can_transition(to) {
        return Err(SchedulerError::InvalidTransition {
            task: task.id,
            from: task.status,
            to,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use covenant_gate::{AdmissionGate, AgentProfile, GoverningRuleset, OathRecord};
    use covenant_ledger::InMemoryLedger;
    use ed25519_dalek::SigningKey;
    use proptest::prelude::*;
    use rand::rngs::OsRng;

    use super::*;
    use crate::task::Priority;

    struct Harness {
        scheduler: TaskScheduler,
        ledger: Arc<InMemoryLedger>,
        agent: AgentId,
    }

    /// Registry with one admitted agent, wired through the real gate.
    fn harness() -> Harness {
        let registry = Arc::new(AgentRegistry::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let ruleset = GoverningRuleset::new("2026.1", "test rules");
        let gate = AdmissionGate::new(
            Arc::clone(&registry),
            ledger.clone() as Arc<dyn EventLedger>,
            ruleset,
        );

        let key = SigningKey::generate(&mut OsRng);
        let agent = AgentId::new("agent-a");
        let oath = OathRecord::swear(&agent, &key, gate.ruleset());
        gate.register(
            AgentProfile::new(agent.clone(), vec!["analysis".into()], key.verifying_key())
                .with_oath(oath),
        )
        .unwrap();

        let scheduler = TaskScheduler::new(registry, ledger.clone() as Arc<dyn EventLedger>);
        Harness {
            scheduler,
            ledger,
            agent,
        }
    }

    #[test]
    fn submit_dispatch_complete_records_events() {
        let mut h = harness();
        let id = h
            .scheduler
            .submit(Task::new("analysis", Priority::Normal))
            .unwrap();

        h.scheduler.dispatch(id, &h.agent).unwrap();
        h.scheduler
            .complete(id, serde_json::json!({ "ok": true }))
            .unwrap();

        let task = h.scheduler.get(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.assignee.as_ref(), Some(&h.agent));

        let kinds: Vec<_> = h
            .ledger
            .read_from(1)
            .unwrap()
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert!(kinds.contains(&EventKind::TaskSubmitted));
        assert!(kinds.contains(&EventKind::TaskStarted));
        assert!(kinds.contains(&EventKind::TaskCompleted));
    }

    #[test]
    fn dispatch_to_unadmitted_agent_is_refused() {
        let mut h = harness();
        let id = h
            .scheduler
            .submit(Task::new("analysis", Priority::Normal))
            .unwrap();

        let stranger = AgentId::new("stranger");
        let error = h.scheduler.dispatch(id, &stranger).unwrap_err();
        assert!(matches!(error, SchedulerError::AgentNotAdmitted(a) if a == stranger));

        // Task untouched by the refused dispatch.
        assert_eq!(h.scheduler.get(&id).unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn next_prefers_priority_then_fifo() {
        let mut h = harness();
        let low = h
            .scheduler
            .submit(Task::new("analysis", Priority::Low))
            .unwrap();
        let critical = h
            .scheduler
            .submit(Task::new("analysis", Priority::Critical))
            .unwrap();
        let high_first = h
            .scheduler
            .submit(Task::new("analysis", Priority::High))
            .unwrap();
        let high_second = h
            .scheduler
            .submit(Task::new("analysis", Priority::High))
            .unwrap();

        assert_eq!(h.scheduler.next().unwrap().id, critical);
        h.scheduler.dispatch(critical, &h.agent.clone()).unwrap();

        assert_eq!(h.scheduler.next().unwrap().id, high_first);
        h.scheduler.dispatch(high_first, &h.agent.clone()).unwrap();

        assert_eq!(h.scheduler.next().unwrap().id, high_second);
        h.scheduler.dispatch(high_second, &h.agent.clone()).unwrap();

        assert_eq!(h.scheduler.next().unwrap().id, low);
    }

    #[test]
    fn next_honors_eligibility_predicate() {
        let mut h = harness();
        h.scheduler
            .submit(Task::new("publishing", Priority::Critical))
            .unwrap();
        let analysis = h
            .scheduler
            .submit(Task::new("analysis", Priority::Low))
            .unwrap();

        h.scheduler
            .set_eligibility(Box::new(|task| task.kind == "analysis"));
        assert_eq!(h.scheduler.next().unwrap().id, analysis);
    }

    #[test]
    fn completed_task_is_never_redispatchable() {
        let mut h = harness();
        let id = h
            .scheduler
            .submit(Task::new("analysis", Priority::Normal))
            .unwrap();
        h.scheduler.dispatch(id, &h.agent.clone()).unwrap();
        h.scheduler.complete(id, serde_json::json!({})).unwrap();

        assert!(h.scheduler.next().is_none());
        let error = h.scheduler.dispatch(id, &h.agent.clone()).unwrap_err();
        assert!(matches!(error, SchedulerError::InvalidTransition { .. }));
    }

    #[test]
    fn blocked_tasks_leave_and_rejoin_the_queue() {
        let mut h = harness();
        let id = h
            .scheduler
            .submit(Task::new("analysis", Priority::Normal))
            .unwrap();

        h.scheduler.block(id, "waiting on upstream").unwrap();
        assert!(h.scheduler.next().is_none());

        h.scheduler.unblock(id).unwrap();
        assert_eq!(h.scheduler.next().unwrap().id, id);
    }

    #[test]
    fn unknown_task_reports_not_found() {
        let mut h = harness();
        let ghost = TaskId::new();
        assert!(matches!(
            h.scheduler.complete(ghost, serde_json::json!({})),
            Err(SchedulerError::TaskNotFound(id)) if id == ghost
        ));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Dispatch,
        Complete,
        Fail,
        Block,
        Unblock,
    }

    fn op_strategy() -> impl Strategy<Value = Vec<Op>> {
        proptest::collection::vec(
            prop_oneof![
                Just(Op::Dispatch),
                Just(Op::Complete),
                Just(Op::Fail),
                Just(Op::Block),
                Just(Op::Unblock),
            ],
            0..16,
        )
    }

    proptest! {
        #[test]
        fn property_terminal_states_are_never_left(ops in op_strategy()) {
            let mut h = harness();
            let id = h.scheduler.submit(Task::new("analysis", Priority::Normal)).unwrap();

            let mut terminal_seen: Option<TaskStatus> = None;
            for op in ops {
                let result = match op {
                    Op::Dispatch => h.scheduler.dispatch(id, &h.agent.clone()).map(|_| ()),
                    Op::Complete => h.scheduler.complete(id, serde_json::json!({})),
                    Op::Fail => h.scheduler.fail(id, "boom"),
                    Op::Block => h.scheduler.block(id, "dep"),
                    Op::Unblock => h.scheduler.unblock(id),
                };

                let status = h.scheduler.get(&id).unwrap().status;
                if let Some(terminal) = terminal_seen {
                    // Once terminal: the status never changes again and
                    // every further operation is rejected.
                    prop_assert_eq!(status, terminal);
                    prop_assert!(result.is_err());
                } else if status.is_terminal() {
                    terminal_seen = Some(status);
                }
            }
        }
    }
}
