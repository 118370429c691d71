use covenant_ledger::LedgerError;
use thiserror::Error;

/// Errors from a watchdog tick.
///
/// Any of these means verification did NOT run to completion; the host
/// must treat monitoring as degraded, not as passed.
#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("ledger unavailable during tick: {0}")]
    Ledger(#[from] LedgerError),

    #[error("violation sink failed: {0}")]
    Sink(String),
}
