use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::traits::EventLedger;

/// Aggregate view over a ledger backend.
///
/// A projection, not a second store: it composes over [`EventLedger`] and
/// is recomputed from the chain on demand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_events: u64,
    pub by_kind: BTreeMap<String, u64>,
}

impl LedgerStats {
    pub fn collect(ledger: &dyn EventLedger) -> Result<Self, LedgerError> {
        let events = ledger.read_from(0)?;

        let mut by_kind: BTreeMap<String, u64> = BTreeMap::new();
        for event in &events {
            *by_kind.entry(event.kind.as_str().to_string()).or_insert(0) += 1;
        }

        Ok(Self {
            total_events: events.len() as u64,
            by_kind,
        })
    }
}
