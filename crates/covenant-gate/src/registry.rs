use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use covenant_types::AgentId;
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::oath::OathRecord;

/// An agent as presented to (and recorded by) the admission boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_id: AgentId,
    /// Task kinds this agent declares it can execute.
    pub capabilities: Vec<String>,
    pub public_key: VerifyingKey,
    pub oath: Option<OathRecord>,
    /// Set only by the gate, after oath verification succeeds.
    pub admitted: bool,
    pub registered_at: Option<DateTime<Utc>>,
}

impl AgentProfile {
    pub fn new(
        agent_id: AgentId,
        capabilities: Vec<String>,
        public_key: VerifyingKey,
    ) -> Self {
        Self {
            agent_id,
            capabilities,
            public_key,
            oath: None,
            admitted: false,
            registered_at: None,
        }
    }

    pub fn with_oath(mut self, oath: OathRecord) -> Self {
        self.oath = Some(oath);
        self
    }

    pub fn covers(&self, task_kind: &str) -> bool {
        self.capabilities.iter().any(|cap| cap == task_kind)
    }
}

/// The live registry of admitted agents.
///
/// Only the gate inserts here, and only after a verified oath; everything
/// else holds a read-only handle for admitted checks and lookups.
pub struct AgentRegistry {
    agents: RwLock<HashMap<AgentId, AgentProfile>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn commit(&self, profile: AgentProfile) -> Result<(), RegistryError> {
        let mut agents = self
            .agents
            .write()
            .map_err(|_| RegistryError::LockPoisoned)?;
        agents.insert(profile.agent_id.clone(), profile);
        Ok(())
    }

    pub fn lookup(&self, agent_id: &AgentId) -> Result<Option<AgentProfile>, RegistryError> {
        let agents = self.agents.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(agents.get(agent_id).cloned())
    }

    /// Admitted state at this instant; unknown agents are not admitted.
    pub fn is_admitted(&self, agent_id: &AgentId) -> Result<bool, RegistryError> {
        let agents = self.agents.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(agents.get(agent_id).map(|a| a.admitted).unwrap_or(false))
    }

    pub fn admitted_agents(&self) -> Result<Vec<AgentProfile>, RegistryError> {
        let agents = self.agents.read().map_err(|_| RegistryError::LockPoisoned)?;
        let mut admitted: Vec<_> = agents.values().filter(|a| a.admitted).cloned().collect();
        admitted.sort_by(|a, b| a.agent_id.0.cmp(&b.agent_id.0));
        Ok(admitted)
    }

    pub fn count(&self) -> Result<usize, RegistryError> {
        let agents = self.agents.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(agents.len())
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
