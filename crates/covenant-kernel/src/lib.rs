//! Covenant Kernel - the wiring layer.
//!
//! One [`KernelContext`] per process, constructed explicitly from
//! [`KernelConfig`] and passed by reference to every component: ledger,
//! registry, gate, scheduler, watchdog. No global state.
//!
//! The run loop is single-threaded and cooperative: one task dispatch per
//! cycle, with the watchdog invoked synchronously between cycles every N
//! cycles. A CRITICAL finding halts dispatch; the ledger stays readable
//! for post-mortem inspection. A failing watchdog degrades the loop to
//! unmonitored instead of being mistaken for a passed verification.

#![deny(unsafe_code)]

pub mod agents;
pub mod config;
pub mod context;
pub mod error;
pub mod kernel;
pub mod telemetry;

pub use agents::{AgentFailure, AgentSpec, AgentTypeRegistry, WorkerAgent};
pub use config::{KernelConfig, LedgerConfig, LoggingConfig, RulesetConfig};
pub use context::KernelContext;
pub use error::KernelError;
pub use kernel::{HaltSignal, Kernel, MonitorHealth};
