//! Covenant Watchdog - scheduler-driven incremental verification.
//!
//! Every N scheduler cycles the watchdog reads the unseen tail of the
//! ledger, asks the judge to verify it (plus bounded preceding context for
//! cross-event rules), persists each new finding as a `VIOLATION` event,
//! and escalates: a CRITICAL finding asks the kernel run loop to halt,
//! everything else is recorded and surfaced without stopping execution.
//!
//! A tick that itself fails is an error to the caller, never a silent
//! success - the host degrades to unmonitored rather than pretending
//! verification ran.

#![deny(unsafe_code)]

pub mod error;
pub mod sink;
pub mod watchdog;

pub use error::WatchdogError;
pub use sink::{FileViolationSink, MemoryViolationSink, ViolationSink};
pub use watchdog::{HaltReason, RuntimeWatchdog, TickReport, WatchdogConfig};
