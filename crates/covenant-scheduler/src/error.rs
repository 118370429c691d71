use covenant_gate::RegistryError;
use covenant_ledger::LedgerError;
use covenant_types::{AgentId, TaskId};
use thiserror::Error;

use crate::task::TaskStatus;

/// Errors from scheduling operations. Recovered locally by rejecting the
/// specific task action; never fatal to the kernel.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid transition for task {task}: {from:?} -> {to:?}")]
    InvalidTransition {
        task: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("agent {0} is not admitted; dispatch refused")]
    AgentNotAdmitted(AgentId),

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
