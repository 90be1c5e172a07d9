//! Minimal on-disk dedup ledger.
//!
//! One line per processed match: `<match_id>,<rfc3339 timestamp>`. Loaded
//! once at startup and appended to as matches complete their fetch. This is
//! the only persistence the pipeline keeps across restarts.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only record of match ids whose replays were already fetched.
pub struct ProcessedLedger {
    path: PathBuf,
    seen: Mutex<HashSet<u64>>,
}

impl ProcessedLedger {
    /// Open (or create) the ledger at `path` and load all recorded ids.
    /// Unparseable lines are skipped with a warning, not fatal.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let mut seen = HashSet::new();

        if path.exists() {
            let file = File::open(path)?;
            for line in BufReader::new(file).lines() {
                let line = line?;
                let id_field = line.split(',').next().unwrap_or("");
                match id_field.trim().parse::<u64>() {
                    Ok(id) => {
                        seen.insert(id);
                    }
                    Err(_) if line.trim().is_empty() => {}
                    Err(_) => {
                        warn!(line = %line, "Skipping unparseable ledger line");
                    }
                }
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            seen: Mutex::new(seen),
        })
    }

    /// Whether a match has already been processed.
    pub fn contains(&self, match_id: u64) -> bool {
        self.seen.lock().expect("ledger lock poisoned").contains(&match_id)
    }

    /// Record a processed match. Idempotent; re-recording an id does not
    /// duplicate the in-memory entry.
    pub fn record(&self, match_id: u64) -> Result<(), LedgerError> {
        {
            let mut seen = self.seen.lock().expect("ledger lock poisoned");
            if !seen.insert(match_id) {
                return Ok(());
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{},{}", match_id, Utc::now().to_rfc3339())?;
        Ok(())
    }

    /// Number of recorded matches.
    pub fn len(&self) -> usize {
        self.seen.lock().expect("ledger lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = ProcessedLedger::open(&dir.path().join("ledger.log")).unwrap();
        assert!(ledger.is_empty());
        assert!(!ledger.contains(1));
    }

    #[test]
    fn test_record_and_contains() {
        let dir = TempDir::new().unwrap();
        let ledger = ProcessedLedger::open(&dir.path().join("ledger.log")).unwrap();
        ledger.record(42).unwrap();
        assert!(ledger.contains(42));
        assert!(!ledger.contains(43));
    }

    #[test]
    fn test_reload_after_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.log");

        let ledger = ProcessedLedger::open(&path).unwrap();
        ledger.record(1).unwrap();
        ledger.record(2).unwrap();
        drop(ledger);

        let reloaded = ProcessedLedger::open(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains(1));
        assert!(reloaded.contains(2));
    }

    #[test]
    fn test_record_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.log");

        let ledger = ProcessedLedger::open(&path).unwrap();
        ledger.record(7).unwrap();
        ledger.record(7).unwrap();
        assert_eq!(ledger.len(), 1);

        let reloaded = ProcessedLedger::open(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_unparseable_lines_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.log");
        std::fs::write(&path, "10,2024-01-01T00:00:00Z\ngarbage\n\n11,x\n").unwrap();

        let ledger = ProcessedLedger::open(&path).unwrap();
        assert!(ledger.contains(10));
        assert!(ledger.contains(11));
        assert_eq!(ledger.len(), 2);
    }
}
