//! Covenant Judge - the rule engine that re-validates system behavior
//! after the fact.
//!
//! Each registered [`InvariantRule`] receives the ordered event stream and
//! reports its findings; a verification pass collects every violation at
//! once instead of short-circuiting on the first. New rules register
//! without touching existing ones.

#![deny(unsafe_code)]

pub mod judge;
pub mod rules;
pub mod violation;

pub use judge::InvariantJudge;
pub use rules::{
    ApprovalBeforeTransfer, InvariantRule, LicenseBeforeBroadcast, MonotonicTime, NoDuplicates,
    NoOrphanedEvents, RuleFinding, WorkflowOrdering,
};
pub use violation::{LedgerSnapshot, VerificationReport, ViolationRecord};
