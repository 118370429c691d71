use chrono::{DateTime, Utc};
use covenant_types::{AgentId, Hash};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

/// The ruleset agents swear themselves to.
///
/// Its hash is what an oath binds; rotating the ruleset invalidates every
/// outstanding oath sworn against the previous hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GoverningRuleset {
    pub version: String,
    pub text: String,
}

impl GoverningRuleset {
    pub fn new(version: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            text: text.into(),
        }
    }

    pub fn hash(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"covenant-ruleset-v1:");
        hasher.update(self.version.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.text.as_bytes());
        Hash::from_bytes(*hasher.finalize().as_bytes())
    }
}

/// A signed attestation binding an agent to a governing ruleset.
///
/// The signature covers `oath_message(agent_id, ruleset_hash)` and is made
/// with the agent's own Ed25519 key; the gate verifies it against the
/// public key the agent declares at registration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OathRecord {
    /// Self-reported sworn state. `false` or defaulted is an immediate
    /// rejection before any cryptography runs.
    pub sworn: bool,
    pub ruleset_version: String,
    pub ruleset_hash: Hash,
    pub signature: Signature,
    pub sworn_at: DateTime<Utc>,
}

impl OathRecord {
    /// Swear an oath: sign the binding of `agent_id` to `ruleset`.
    pub fn swear(agent_id: &AgentId, signing_key: &SigningKey, ruleset: &GoverningRuleset) -> Self {
        let ruleset_hash = ruleset.hash();
        let message = oath_message(agent_id, &ruleset_hash);
        Self {
            sworn: true,
            ruleset_version: ruleset.version.clone(),
            ruleset_hash,
            signature: signing_key.sign(&message),
            sworn_at: Utc::now(),
        }
    }

    /// Verify this oath against a declared public key and the currently
    /// governing ruleset hash.
    pub fn verify(&self, agent_id: &AgentId, public_key: &VerifyingKey, current: &Hash) -> bool {
        if self.ruleset_hash != *current {
            return false;
        }
        let message = oath_message(agent_id, &self.ruleset_hash);
        public_key.verify(&message, &self.signature).is_ok()
    }
}

/// The 32-byte digest an oath signature covers.
fn oath_message(agent_id: &AgentId, ruleset_hash: &Hash) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"covenant-oath-v1:");
    hasher.update(agent_id.0.as_bytes());
    hasher.update(b"\n");
    hasher.update(ruleset_hash.as_bytes());
    *hasher.finalize().as_bytes()
}
