use std::sync::Arc;

use covenant_gate::{AdmissionGate, AgentRegistry, GoverningRuleset};
use covenant_judge::InvariantJudge;
use covenant_ledger::{EventLedger, FileLedger, InMemoryLedger};
use covenant_scheduler::TaskScheduler;
use covenant_watchdog::RuntimeWatchdog;
use tracing::info;

use crate::config::{KernelConfig, LedgerConfig};
use crate::error::KernelError;

/// The explicit per-process kernel state.
///
/// Constructed once at startup and handed to the run loop; every component
/// receives its collaborators here rather than through globals.
pub struct KernelContext {
    pub config: KernelConfig,
    pub ledger: Arc<dyn EventLedger>,
    pub registry: Arc<AgentRegistry>,
    pub gate: AdmissionGate,
    pub scheduler: TaskScheduler,
    pub watchdog: RuntimeWatchdog,
}

impl KernelContext {
    /// Build a context with the ledger backend the config names.
    pub fn from_config(config: KernelConfig) -> Result<Self, KernelError> {
        let ledger: Arc<dyn EventLedger> = match &config.ledger {
            LedgerConfig::Memory => Arc::new(InMemoryLedger::new()),
            LedgerConfig::File { path } => Arc::new(FileLedger::open(path)?),
        };
        Ok(Self::with_ledger(config, ledger))
    }

    /// Build a context over a caller-provided ledger backend.
    pub fn with_ledger(config: KernelConfig, ledger: Arc<dyn EventLedger>) -> Self {
        let registry = Arc::new(AgentRegistry::new());
        let ruleset = GoverningRuleset::new(&config.ruleset.version, &config.ruleset.text);
        let gate = AdmissionGate::new(Arc::clone(&registry), Arc::clone(&ledger), ruleset);
        let scheduler = TaskScheduler::new(Arc::clone(&registry), Arc::clone(&ledger));
        let watchdog = RuntimeWatchdog::new(
            InvariantJudge::with_standard_rules(),
            Arc::clone(&ledger),
            config.watchdog.clone(),
        );

        info!(
            ruleset = %config.ruleset.version,
            check_interval = config.watchdog.check_interval_cycles,
            "kernel context constructed"
        );

        Self {
            config,
            ledger,
            registry,
            gate,
            scheduler,
            watchdog,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_builds_from_default_config() {
        let context = KernelContext::from_config(KernelConfig::default()).unwrap();
        // Fresh chain: genesis only.
        assert_eq!(context.ledger.head_seq().unwrap(), 0);
        assert_eq!(context.registry.count().unwrap(), 0);
    }

    #[test]
    fn file_backend_selected_by_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let config = KernelConfig {
            ledger: crate::config::LedgerConfig::File {
                path: path.to_string_lossy().into_owned(),
            },
            ..KernelConfig::default()
        };

        let context = KernelContext::from_config(config).unwrap();
        assert_eq!(context.ledger.head_seq().unwrap(), 0);
        assert!(path.exists());
    }
}
