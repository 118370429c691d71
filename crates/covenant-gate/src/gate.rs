use std::sync::Arc;

use chrono::Utc;
use covenant_ledger::EventLedger;
use covenant_types::EventKind;
use tracing::{info, warn};

use crate::error::{AdmissionError, ReasonCode};
use crate::oath::GoverningRuleset;
use crate::registry::{AgentProfile, AgentRegistry};

/// The one-time admission check an agent must pass before the scheduler
/// will ever dispatch it work.
///
/// Checks run in a fixed order so that cheap data-presence checks reject
/// malformed input before any cryptography runs:
/// 1. inspection - the oath record exists at all;
/// 2. verification - the oath's self-reported state is sworn;
/// 3. cryptographic validation - the signature verifies against the
///    declared public key and the currently governing ruleset hash;
/// 4. commit - registry insert plus exactly one `AGENT_REGISTERED` event.
///
/// Rejection never appends to the ledger, keeping the chain free of noise
/// from invalid registration attempts.
pub struct AdmissionGate {
    registry: Arc<AgentRegistry>,
    ledger: Arc<dyn EventLedger>,
    ruleset: GoverningRuleset,
}

impl AdmissionGate {
    pub fn new(
        registry: Arc<AgentRegistry>,
        ledger: Arc<dyn EventLedger>,
        ruleset: GoverningRuleset,
    ) -> Self {
        Self {
            registry,
            ledger,
            ruleset,
        }
    }

    pub fn ruleset(&self) -> &GoverningRuleset {
        &self.ruleset
    }

    /// Run the full admission check, synchronously, and commit on success.
    pub fn register(&self, mut profile: AgentProfile) -> Result<(), AdmissionError> {
        let agent_id = profile.agent_id.clone();

        if self.registry.is_admitted(&agent_id)? {
            return Err(AdmissionError::denied(
                ReasonCode::AlreadyRegistered,
                format!("agent {} is already admitted", agent_id),
            ));
        }

        // Stage 1: inspection.
        let Some(oath) = profile.oath.as_ref() else {
            warn!(agent = %agent_id, "admission rejected: no oath record");
            return Err(AdmissionError::denied(
                ReasonCode::MissingOathAttributes,
                format!("agent {} exposes no oath record", agent_id),
            ));
        };

        // Stage 2: verification of the self-reported state.
        if !oath.sworn {
            warn!(agent = %agent_id, "admission rejected: oath not sworn");
            return Err(AdmissionError::denied(
                ReasonCode::OathNotSworn,
                format!("agent {} has not sworn its oath", agent_id),
            ));
        }

        // Stage 3: cryptographic validation against the governing ruleset.
        let current = self.ruleset.hash();
        if !oath.verify(&agent_id, &profile.public_key, &current) {
            warn!(agent = %agent_id, ruleset = %self.ruleset.version, "admission rejected: oath signature invalid");
            return Err(AdmissionError::denied(
                ReasonCode::InvalidSignature,
                format!(
                    "oath signature for agent {} does not bind ruleset {}",
                    agent_id, self.ruleset.version
                ),
            ));
        }

        // Stage 4: commit. The admitted flag flips only here, inside the
        // same call that verified the oath.
        let signature_hex: String = oath
            .signature
            .to_bytes()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        let ruleset_version = oath.ruleset_version.clone();
        profile.admitted = true;
        profile.registered_at = Some(Utc::now());

        self.ledger.append(
            EventKind::AgentRegistered,
            &agent_id,
            None,
            serde_json::json!({
                "capabilities": profile.capabilities,
                "oath_signature": signature_hex,
                "ruleset_version": ruleset_version,
            }),
        )?;
        self.registry.commit(profile)?;

        info!(agent = %agent_id, ruleset = %self.ruleset.version, "agent admitted");
        Ok(())
    }
}
