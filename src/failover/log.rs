//! Append-only failover event log.
//!
//! # Responsibilities
//! - Assign sequence numbers and keep events in append order
//! - Persist every event as one JSON line, synced to disk
//! - Replay the file on startup
//! - Serve full or tail reads to any number of readers
//!
//! # Design Decisions
//! - `append` never fails: a write error leaves the event in memory and
//!   queued, reported as an error log and a metric
//! - Queued events are written in order before any newer event
//! - Replay truncates a torn trailing line, skips malformed lines and
//!   duplicate sequence numbers

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::config::EventLogConfig;
use crate::failover::event::FailoverEvent;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("event log I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Cloneable read access to the log.
#[derive(Debug, Clone, Default)]
pub struct EventLogReader {
    events: Arc<RwLock<Vec<FailoverEvent>>>,
}

impl EventLogReader {
    pub fn all(&self) -> Vec<FailoverEvent> {
        self.events.read().clone()
    }

    /// The most recent `n` events, oldest first.
    pub fn tail(&self, n: usize) -> Vec<FailoverEvent> {
        let events = self.events.read();
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    pub fn last(&self) -> Option<FailoverEvent> {
        self.events.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

/// The single-writer side of the log.
#[derive(Debug)]
pub struct EventLog {
    reader: EventLogReader,
    path: Option<PathBuf>,
    pending: VecDeque<FailoverEvent>,
    next_sequence: u64,
    needs_newline: bool,
}

impl EventLog {
    /// A log that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            reader: EventLogReader::default(),
            path: None,
            pending: VecDeque::new(),
            next_sequence: 1,
            needs_newline: false,
        }
    }

    /// Open (or create) a JSON-lines log and replay its contents.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EventLogError> {
        let path = path.into();
        let io_err = |source| EventLogError::Io { path: path.clone(), source };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut log = Self::in_memory();
        log.path = Some(path.clone());

        if !path.exists() {
            return Ok(log);
        }

        // Bytes, not a String: a torn tail may end inside a UTF-8 sequence.
        let content = fs::read(&path).map_err(io_err)?;
        let segments: Vec<&[u8]> = content.split(|b| *b == b'\n').collect();
        let last_idx = segments.len() - 1;

        let mut events: Vec<FailoverEvent> = Vec::with_capacity(segments.len());
        for (idx, line) in segments.iter().enumerate() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<FailoverEvent>(line) {
                Ok(event) => {
                    if idx == last_idx {
                        log.needs_newline = true;
                    }
                    if events.last().is_some_and(|prev| event.sequence <= prev.sequence) {
                        tracing::warn!(sequence = event.sequence, "Skipping duplicate event log entry");
                        continue;
                    }
                    events.push(event);
                }
                Err(e) if idx == last_idx => {
                    // A write interrupted mid-line; cut it off so new appends start clean.
                    tracing::warn!(path = ?path, line = idx + 1, error = %e, "Truncating torn trailing event log line");
                    let valid_len = content.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
                    OpenOptions::new()
                        .write(true)
                        .open(&path)
                        .and_then(|f| f.set_len(valid_len as u64))
                        .map_err(io_err)?;
                }
                Err(e) => {
                    metrics::record_log_replay_skip();
                    tracing::warn!(path = ?path, line = idx + 1, error = %e, "Skipping malformed event log line");
                }
            }
        }

        log.next_sequence = events.last().map_or(1, |e| e.sequence + 1);
        tracing::info!(path = ?path, events = events.len(), "Replayed failover event log");
        *log.reader.events.write() = events;
        Ok(log)
    }

    pub fn from_config(config: &EventLogConfig) -> Result<Self, EventLogError> {
        match &config.path {
            Some(path) => Self::open(path),
            None => Ok(Self::in_memory()),
        }
    }

    pub fn reader(&self) -> EventLogReader {
        self.reader.clone()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn last(&self) -> Option<FailoverEvent> {
        self.reader.last()
    }

    pub fn len(&self) -> usize {
        self.reader.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reader.is_empty()
    }

    /// Events recorded in memory but not yet on disk.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Record an event. Returns it with its sequence number assigned.
    pub fn append(&mut self, mut event: FailoverEvent) -> FailoverEvent {
        event.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.reader.events.write().push(event.clone());

        if self.path.is_some() {
            self.pending.push_back(event.clone());
            if let Err(e) = self.flush() {
                metrics::record_log_write_failure();
                tracing::error!(
                    error = %e,
                    sequence = event.sequence,
                    pending = self.pending.len(),
                    "Failed to persist failover event; will retry"
                );
            }
        }
        event
    }

    /// Write queued events to disk, oldest first.
    ///
    /// A failed write or sync cuts the file back to the last fully synced
    /// line, so a retry never lands behind a partial fragment.
    pub fn flush(&mut self) -> Result<(), EventLogError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        if self.pending.is_empty() {
            return Ok(());
        }
        let io_err = |source| EventLogError::Io { path: path.clone(), source };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        let mut committed = file.metadata().map_err(io_err)?.len();

        let result = self.write_pending(&mut file, &mut committed);
        if let Err(e) = &result {
            match file.set_len(committed) {
                Ok(()) => tracing::debug!(len = committed, error = %e, "Rolled back partial event log write"),
                Err(truncate_err) => {
                    // Unknown tail; start the next write on a fresh line.
                    self.needs_newline = true;
                    tracing::warn!(error = %truncate_err, "Failed to roll back partial event log write");
                }
            }
        }
        result.map_err(io_err)
    }

    fn write_pending(&mut self, file: &mut File, committed: &mut u64) -> std::io::Result<()> {
        if self.needs_newline {
            file.write_all(b"\n")?;
            file.sync_data()?;
            *committed += 1;
            self.needs_newline = false;
        }

        while let Some(event) = self.pending.front() {
            let mut line = serde_json::to_vec(event)?;
            line.push(b'\n');
            file.write_all(&line)?;
            file.sync_data()?;
            *committed += line.len() as u64;
            self.pending.pop_front();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failover::event::FailoverReason;
    use chrono::Utc;

    fn event(prev: Option<&str>, next: Option<&str>) -> FailoverEvent {
        FailoverEvent::new(
            Utc::now(),
            prev.map(String::from),
            next.map(String::from),
            FailoverReason::HealthDegradation,
        )
    }

    #[test]
    fn test_sequence_and_tail() {
        let mut log = EventLog::in_memory();
        for _ in 0..5 {
            log.append(event(Some("a"), Some("b")));
        }
        let reader = log.reader();
        assert_eq!(reader.len(), 5);
        let tail = reader.tail(2);
        assert_eq!(tail.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![4, 5]);
        assert_eq!(reader.tail(100).len(), 5);
        assert!(!log.has_pending());
    }

    #[test]
    fn test_persist_and_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("events.jsonl");

        {
            let mut log = EventLog::open(&path).unwrap();
            log.append(event(Some("aws"), Some("azure")));
            log.append(event(Some("azure"), None));
        }

        let mut log = EventLog::open(&path).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.last().unwrap().new_active, None);
        let next = log.append(event(None, Some("gcp")));
        assert_eq!(next.sequence, 3);

        let replayed = EventLog::open(&path).unwrap();
        assert_eq!(replayed.len(), 3);
    }

    #[test]
    fn test_torn_trailing_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        {
            let mut log = EventLog::open(&path).unwrap();
            log.append(event(Some("aws"), Some("azure")));
        }
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"sequence\":2,\"id\":").unwrap();

        let mut log = EventLog::open(&path).unwrap();
        assert_eq!(log.len(), 1);
        log.append(event(Some("azure"), Some("aws")));

        let replayed = EventLog::open(&path).unwrap();
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed.last().unwrap().sequence, 2);
    }

    #[test]
    fn test_malformed_middle_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut log = EventLog::open(&path).unwrap();
        log.append(event(Some("aws"), Some("azure")));

        // A fragment left behind by an interrupted write, then more appends
        // glued straight onto it.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"sequence\":2,\"id\":\"0").unwrap();
        log.append(event(Some("azure"), Some("gcp")));
        log.append(event(Some("gcp"), Some("aws")));
        drop(log);

        let mut replayed = EventLog::open(&path).unwrap();
        let sequences: Vec<u64> = replayed.reader().all().iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 3]);
        assert_eq!(replayed.last().unwrap().new_active.as_deref(), Some("aws"));
        assert_eq!(replayed.append(event(Some("aws"), None)).sequence, 4);
    }

    #[test]
    fn test_torn_tail_inside_utf8_character_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        {
            let mut log = EventLog::open(&path).unwrap();
            log.append(event(Some("zürich"), Some("aws")));
        }
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"sequence\":2,\"previous\":\"z\xc3").unwrap();
        drop(file);

        let mut log = EventLog::open(&path).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().previous.as_deref(), Some("zürich"));
        log.append(event(Some("aws"), Some("zürich")));

        let replayed = EventLog::open(&path).unwrap();
        assert_eq!(replayed.len(), 2);
        assert!(fs::read_to_string(&path).is_ok());
    }

    #[test]
    fn test_write_failure_keeps_event_and_retries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut log = EventLog::open(&path).unwrap();

        // A directory where the file should be makes every open fail.
        fs::create_dir(&path).unwrap();
        let recorded = log.append(event(Some("aws"), Some("azure")));
        assert_eq!(recorded.sequence, 1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.pending(), 1);
        assert!(log.flush().is_err());

        fs::remove_dir(&path).unwrap();
        log.append(event(Some("azure"), Some("gcp")));
        assert_eq!(log.pending(), 0);

        let replayed = EventLog::open(&path).unwrap();
        let sequences: Vec<u64> = replayed.reader().all().iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }
}
