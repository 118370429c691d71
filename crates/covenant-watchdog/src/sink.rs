use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use covenant_judge::ViolationRecord;

use crate::error::WatchdogError;

/// The separate append-only violation stream - logically a projection of
/// the main ledger's `VIOLATION` events, written on its own path so
/// operators can tail findings without replaying the chain.
pub trait ViolationSink: Send + Sync {
    fn record(&self, violation: &ViolationRecord) -> Result<(), WatchdogError>;
}

/// In-memory sink for tests and embedding.
pub struct MemoryViolationSink {
    records: Mutex<Vec<ViolationRecord>>,
}

impl MemoryViolationSink {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<ViolationRecord> {
        self.records.lock().expect("sink lock").clone()
    }
}

impl Default for MemoryViolationSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ViolationSink for MemoryViolationSink {
    fn record(&self, violation: &ViolationRecord) -> Result<(), WatchdogError> {
        self.records
            .lock()
            .map_err(|_| WatchdogError::Sink("sink lock poisoned".to_string()))?
            .push(violation.clone());
        Ok(())
    }
}

/// JSON-lines violation log on disk, one record per line.
pub struct FileViolationSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileViolationSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WatchdogError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| WatchdogError::Sink(e.to_string()))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| WatchdogError::Sink(e.to_string()))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ViolationSink for FileViolationSink {
    fn record(&self, violation: &ViolationRecord) -> Result<(), WatchdogError> {
        let mut line = serde_json::to_vec(violation)
            .map_err(|e| WatchdogError::Sink(e.to_string()))?;
        line.push(b'\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| WatchdogError::Sink("sink lock poisoned".to_string()))?;
        file.write_all(&line)
            .and_then(|_| file.sync_all())
            .map_err(|e| WatchdogError::Sink(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use covenant_judge::LedgerSnapshot;
    use covenant_types::Severity;

    use super::*;

    fn violation() -> ViolationRecord {
        ViolationRecord {
            rule: "license-before-broadcast".to_string(),
            severity: Severity::Critical,
            offending_seqs: vec![4],
            explanation: "publish without license".to_string(),
            snapshot: LedgerSnapshot {
                events_seen: 5,
                violations_so_far: 1,
            },
        }
    }

    #[test]
    fn memory_sink_accumulates() {
        let sink = MemoryViolationSink::new();
        sink.record(&violation()).unwrap();
        sink.record(&violation()).unwrap();
        assert_eq!(sink.records().len(), 2);
    }

    #[test]
    fn file_sink_writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("violations.jsonl");
        let sink = FileViolationSink::open(&path).unwrap();

        sink.record(&violation()).unwrap();
        sink.record(&violation()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: ViolationRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.rule, "license-before-broadcast");
    }
}
