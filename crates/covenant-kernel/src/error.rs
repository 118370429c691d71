use covenant_gate::{AdmissionError, RegistryError};
use covenant_ledger::LedgerError;
use covenant_scheduler::SchedulerError;
use thiserror::Error;

/// Errors from kernel construction and the run loop.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("no constructor registered for agent type '{0}'")]
    UnknownAgentType(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
