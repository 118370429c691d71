use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use covenant_types::{AgentId, EventKind, TaskId};
use tracing::{debug, info};

use crate::error::LedgerError;
use crate::event::{verify_chain, Event};
use crate::traits::{ChainIntegrity, EventLedger};

/// Durable ledger backend: an append-only JSON-lines file, one event per
/// line, fsynced after every append.
///
/// On open, the whole file is re-read and the chain verified before the
/// ledger accepts new writes; a corrupted store refuses to open rather than
/// silently extending a broken chain.
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    inner: Mutex<FileState>,
}

#[derive(Debug)]
struct FileState {
    writer: File,
    /// Snapshot of the durable chain; only extended after a successful write.
    events: Vec<Event>,
}

impl FileLedger {
    /// Open or create the ledger file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let events = if path.exists() {
            let events = read_events(&path)?;
            if !events.is_empty() {
                match verify_chain(&events)? {
                    ChainIntegrity::Clean => {}
                    ChainIntegrity::Corrupted { seq, reason } => {
                        return Err(LedgerError::IntegrityViolation { seq, reason });
                    }
                }
            }
            events
        } else {
            vec![]
        };

        let mut writer = OpenOptions::new().create(true).append(true).open(&path)?;

        let events = if events.is_empty() {
            let genesis = Event::genesis();
            write_line(&mut writer, &genesis)?;
            vec![genesis]
        } else {
            events
        };

        info!(path = %path.display(), records = events.len(), "file ledger opened");
        Ok(Self {
            path,
            inner: Mutex::new(FileState { writer, events }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_events(path: &Path) -> Result<Vec<Event>, LedgerError> {
    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str(&line)?);
    }
    Ok(events)
}

fn write_line(writer: &mut File, event: &Event) -> Result<(), LedgerError> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    writer.write_all(&line)?;
    writer.sync_all()?;
    Ok(())
}

impl EventLedger for FileLedger {
    fn append(
        &self,
        kind: EventKind,
        agent_id: &AgentId,
        task_id: Option<TaskId>,
        details: serde_json::Value,
    ) -> Result<Event, LedgerError> {
        let mut state = self.inner.lock().map_err(|_| LedgerError::LockPoisoned)?;

        let tail = state.events.last().expect("chain always holds genesis");
        let event = Event::build(
            tail.seq + 1,
            kind,
            agent_id.clone(),
            task_id,
            Utc::now(),
            details,
            tail.hash,
        )?;

        // Durable first; the in-memory snapshot only advances after fsync.
        write_line(&mut state.writer, &event)?;
        state.events.push(event.clone());

        debug!(seq = event.seq, kind = %event.kind, "event persisted");
        Ok(event)
    }

    fn read_range(&self, from_seq: u64, to_seq: u64) -> Result<Vec<Event>, LedgerError> {
        if from_seq > to_seq {
            return Err(LedgerError::InvalidRange {
                from: from_seq,
                to: to_seq,
            });
        }

        let state = self.inner.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let start = from_seq as usize;
        if start >= state.events.len() {
            return Ok(vec![]);
        }
        let end_exclusive = ((to_seq + 1) as usize).min(state.events.len());
        Ok(state.events[start..end_exclusive].to_vec())
    }

    fn head_seq(&self) -> Result<u64, LedgerError> {
        let state = self.inner.lock().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.events.last().expect("chain always holds genesis").seq)
    }

    fn event_count(&self) -> Result<u64, LedgerError> {
        let state = self.inner.lock().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.events.len() as u64)
    }

    /// Re-reads the file from disk so on-disk tampering is caught even when
    /// the in-memory snapshot is intact.
    fn verify_chain_integrity(&self) -> Result<ChainIntegrity, LedgerError> {
        let _guard = self.inner.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let events = read_events(&self.path)?;
        verify_chain(&events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("ledger.jsonl")
    }

    #[test]
    fn open_seeds_genesis_and_appends_persist() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::open(ledger_path(&dir)).unwrap();
        let agent = AgentId::new("agent-a");

        assert_eq!(ledger.head_seq().unwrap(), 0);

        let event = ledger
            .append(
                EventKind::TaskSubmitted,
                &agent,
                Some(TaskId::new()),
                serde_json::json!({ "kind": "analysis" }),
            )
            .unwrap();
        assert_eq!(event.seq, 1);
        assert!(ledger.verify_chain_integrity().unwrap().is_clean());
    }

    #[test]
    fn reopen_recovers_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = ledger_path(&dir);
        let agent = AgentId::new("agent-a");

        {
            let ledger = FileLedger::open(&path).unwrap();
            for _ in 0..5 {
                ledger
                    .append(EventKind::TaskSubmitted, &agent, None, serde_json::json!({}))
                    .unwrap();
            }
        }

        let reopened = FileLedger::open(&path).unwrap();
        assert_eq!(reopened.head_seq().unwrap(), 5);
        assert!(reopened.verify_chain_integrity().unwrap().is_clean());

        let appended = reopened
            .append(EventKind::TaskStarted, &agent, None, serde_json::json!({}))
            .unwrap();
        assert_eq!(appended.seq, 6);
    }

    #[test]
    fn on_disk_tampering_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = ledger_path(&dir);
        let agent = AgentId::new("agent-a");

        let ledger = FileLedger::open(&path).unwrap();
        for _ in 0..3 {
            ledger
                .append(EventKind::TaskSubmitted, &agent, None, serde_json::json!({}))
                .unwrap();
        }

        // Forge the payload of record 2 directly in the file.
        let raw = std::fs::read_to_string(&path).unwrap();
        let edited: Vec<String> = raw
            .lines()
            .map(|line| {
                let mut event: Event = serde_json::from_str(line).unwrap();
                if event.seq == 2 {
                    event.details = serde_json::json!({ "forged": true });
                }
                serde_json::to_string(&event).unwrap()
            })
            .collect();
        std::fs::write(&path, edited.join("\n") + "\n").unwrap();

        match ledger.verify_chain_integrity().unwrap() {
            ChainIntegrity::Corrupted { seq, .. } => assert_eq!(seq, 2),
            ChainIntegrity::Clean => panic!("tampered file reported clean"),
        }
    }

    #[test]
    fn corrupted_store_refuses_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = ledger_path(&dir);
        let agent = AgentId::new("agent-a");

        {
            let ledger = FileLedger::open(&path).unwrap();
            ledger
                .append(EventKind::TaskSubmitted, &agent, None, serde_json::json!({}))
                .unwrap();
        }

        let raw = std::fs::read_to_string(&path).unwrap();
        let edited: Vec<String> = raw
            .lines()
            .map(|line| {
                let mut event: Event = serde_json::from_str(line).unwrap();
                if event.seq == 1 {
                    event.details = serde_json::json!({ "forged": true });
                }
                serde_json::to_string(&event).unwrap()
            })
            .collect();
        std::fs::write(&path, edited.join("\n") + "\n").unwrap();

        let error = FileLedger::open(&path).unwrap_err();
        assert!(matches!(
            error,
            LedgerError::IntegrityViolation { seq: 1, .. }
        ));
    }
}
