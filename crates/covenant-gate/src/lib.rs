//! Covenant Gate - the admission boundary of the kernel.
//!
//! An agent may only receive work after passing the gate exactly once. The
//! gate runs three strictly ordered, short-circuiting checks - oath
//! presence, sworn state, Ed25519 signature over the governing ruleset -
//! and only then commits the agent to the live registry and records a
//! single `AGENT_REGISTERED` event. Rejections never touch the ledger.
//!
//! The whole check completes synchronously inside [`AdmissionGate::register`];
//! there is no deferred admitted flag and therefore no window in which an
//! unverified agent could be dispatched a task.

#![deny(unsafe_code)]

pub mod error;
pub mod gate;
pub mod oath;
pub mod registry;

pub use error::{AdmissionError, ReasonCode, RegistryError};
pub use gate::AdmissionGate;
pub use oath::{GoverningRuleset, OathRecord};
pub use registry::{AgentProfile, AgentRegistry};
