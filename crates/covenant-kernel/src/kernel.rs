use std::sync::Arc;

use covenant_gate::AdmissionError;
use covenant_scheduler::{SchedulerError, Task};
use covenant_types::{AgentId, EventKind, TaskId};
use covenant_watchdog::HaltReason;
use tracing::{debug, error, info, warn};

use crate::agents::{AgentTypeRegistry, WorkerAgent};
use crate::config::KernelConfig;
use crate::context::KernelContext;
use crate::error::KernelError;

/// Whether the watchdog is currently believed to be working.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorHealth {
    Monitored,
    /// The last due tick failed; verification is NOT running. Surfaced to
    /// operators instead of being mistaken for a clean pass.
    Unmonitored,
}

/// The halt state the hosting process consumes.
#[derive(Clone, Debug)]
pub struct HaltSignal {
    pub should_halt: bool,
    pub reason: Option<HaltReason>,
}

impl HaltSignal {
    fn clear() -> Self {
        Self {
            should_halt: false,
            reason: None,
        }
    }
}

/// The kernel run loop: admits configured agents once, then cooperatively
/// dispatches one task per cycle with the watchdog interleaved.
pub struct Kernel {
    context: KernelContext,
    workers: Vec<Arc<dyn WorkerAgent>>,
    cycle: u64,
    monitor_health: MonitorHealth,
    halt: HaltSignal,
}

impl Kernel {
    /// Build the context from config, construct the configured agents, and
    /// run each through the admission gate. An agent that fails admission
    /// is skipped and logged; it is never dispatched work.
    pub fn new(config: KernelConfig, types: &AgentTypeRegistry) -> Result<Self, KernelError> {
        let context = KernelContext::from_config(config)?;
        let mut kernel = Self::from_context(context);

        let specs = kernel.context.config.agents.clone();
        for spec in &specs {
            let worker = types.build(spec, Arc::clone(&kernel.context.ledger))?;
            if let Err(error) = kernel.register_worker(worker) {
                warn!(agent = %spec.id, %error, "agent failed admission; skipped");
            }
        }

        Ok(kernel)
    }

    pub fn from_context(context: KernelContext) -> Self {
        Self {
            context,
            workers: Vec::new(),
            cycle: 0,
            monitor_health: MonitorHealth::Monitored,
            halt: HaltSignal::clear(),
        }
    }

    /// Admit a worker through the gate and make it dispatchable.
    pub fn register_worker(&mut self, worker: Arc<dyn WorkerAgent>) -> Result<(), AdmissionError> {
        let profile = worker.profile(self.context.gate.ruleset());
        self.context.gate.register(profile)?;
        self.workers.push(worker);
        Ok(())
    }

    pub fn submit(&mut self, task: Task) -> Result<TaskId, SchedulerError> {
        self.context.scheduler.submit(task)
    }

    /// Run up to `cycles` dispatch cycles, stopping early on halt.
    pub async fn run_cycles(&mut self, cycles: u64) -> Result<HaltSignal, KernelError> {
        for _ in 0..cycles {
            if self.halt.should_halt {
                break;
            }
            self.cycle += 1;

            self.dispatch_one().await?;

            if self.context.watchdog.is_due(self.cycle) {
                match self.context.watchdog.tick(self.cycle) {
                    Ok(report) => {
                        self.monitor_health = MonitorHealth::Monitored;
                        if report.should_halt {
                            self.halt(report.halt_reason)?;
                        }
                    }
                    Err(tick_error) => {
                        error!(cycle = self.cycle, error = %tick_error, "watchdog tick failed; kernel is unmonitored");
                        self.monitor_health = MonitorHealth::Unmonitored;
                    }
                }
            }
        }

        Ok(self.halt.clone())
    }

    async fn dispatch_one(&mut self) -> Result<(), KernelError> {
        let Some(task) = self.context.scheduler.next() else {
            return Ok(());
        };
        let Some(worker) = self.worker_for(&task.kind) else {
            debug!(task = %task.id, kind = %task.kind, "no capable worker; task left pending");
            return Ok(());
        };

        match self.context.scheduler.dispatch(task.id, worker.agent_id()) {
            Ok(dispatched) => match worker.execute(&dispatched).await {
                Ok(result) => self.context.scheduler.complete(task.id, result)?,
                Err(failure) => self.context.scheduler.fail(task.id, failure.to_string())?,
            },
            Err(SchedulerError::AgentNotAdmitted(agent)) => {
                warn!(task = %task.id, %agent, "dispatch refused: agent not admitted");
            }
            Err(other) => return Err(other.into()),
        }

        Ok(())
    }

    fn worker_for(&self, kind: &str) -> Option<Arc<dyn WorkerAgent>> {
        self.workers
            .iter()
            .find(|w| w.capabilities().iter().any(|c| c == kind))
            .cloned()
    }

    fn halt(&mut self, reason: Option<HaltReason>) -> Result<(), KernelError> {
        info!(cycle = self.cycle, "kernel halting; dispatch stopped, ledger stays readable");
        self.context.ledger.append(
            EventKind::KernelHalted,
            &AgentId::kernel(),
            None,
            serde_json::json!({ "cycle": self.cycle, "reason": &reason }),
        )?;
        self.halt = HaltSignal {
            should_halt: true,
            reason,
        };
        Ok(())
    }

    pub fn halt_signal(&self) -> &HaltSignal {
        &self.halt
    }

    pub fn monitor_health(&self) -> MonitorHealth {
        self.monitor_health
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn context(&self) -> &KernelContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut KernelContext {
        &mut self.context
    }
}
