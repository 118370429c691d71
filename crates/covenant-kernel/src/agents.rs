use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use covenant_gate::{AgentProfile, GoverningRuleset};
use covenant_ledger::EventLedger;
use covenant_scheduler::Task;
use covenant_types::AgentId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::KernelError;

/// Failure reported by an agent executing a task. Recorded through
/// `TaskScheduler::fail`, never fatal to the kernel.
#[derive(Debug, Error)]
#[error("agent execution failed: {0}")]
pub struct AgentFailure(pub String);

/// The execution boundary a worker agent implements.
///
/// Agents append their own domain events to the ledger as they act; the
/// kernel only sees the final result.
#[async_trait]
pub trait WorkerAgent: Send + Sync {
    fn agent_id(&self) -> &AgentId;

    fn capabilities(&self) -> &[String];

    /// The profile this agent presents at the admission gate, with its
    /// oath sworn against the ruleset it is shown.
    fn profile(&self, ruleset: &GoverningRuleset) -> AgentProfile;

    async fn execute(&self, task: &Task) -> Result<serde_json::Value, AgentFailure>;
}

/// One entry of the startup agent list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentSpec {
    pub agent_type: String,
    pub id: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Constructor for one agent type. Receives the spec plus a ledger handle
/// so the built agent can record its own domain events.
pub type AgentConstructor =
    dyn Fn(&AgentSpec, Arc<dyn EventLedger>) -> Arc<dyn WorkerAgent> + Send + Sync;

/// Explicit table mapping stable agent-type identifiers to constructors.
///
/// Populated at startup from the configuration list; there is no
/// reflection or manifest scanning.
pub struct AgentTypeRegistry {
    constructors: HashMap<String, Box<AgentConstructor>>,
}

impl AgentTypeRegistry {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn register(&mut self, agent_type: impl Into<String>, constructor: Box<AgentConstructor>) {
        let agent_type = agent_type.into();
        debug!(agent_type = %agent_type, "agent type registered");
        self.constructors.insert(agent_type, constructor);
    }

    pub fn build(
        &self,
        spec: &AgentSpec,
        ledger: Arc<dyn EventLedger>,
    ) -> Result<Arc<dyn WorkerAgent>, KernelError> {
        let constructor = self
            .constructors
            .get(&spec.agent_type)
            .ok_or_else(|| KernelError::UnknownAgentType(spec.agent_type.clone()))?;
        Ok(constructor(spec, ledger))
    }

    pub fn known_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl Default for AgentTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
