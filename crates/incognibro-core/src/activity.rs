//! Protection activity log.
//!
//! Every completed scan appends one summary entry. The log keeps the most
//! recent [`ACTIVITY_LOG_CAPACITY`] entries, newest first.

use std::collections::VecDeque;
use std::convert::Infallible;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Maximum number of retained log entries.
pub const ACTIVITY_LOG_CAPACITY: usize = 100;

/// Summary of one scan, ready to be logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActivityEntry {
    /// Preview of the scanned input.
    pub target: String,
    /// Number of tracker domains found.
    pub detected_count: u32,
    /// Number of trackers counted as blocked.
    pub blocked_count: u32,
    /// Auto-stop preference at scan time.
    pub auto_stop_enabled: bool,
}

/// A stored log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub target: String,
    pub detected_count: u32,
    pub blocked_count: u32,
    pub auto_stop_enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Storage for scan summaries.
pub trait ActivityLog {
    type Error: std::error::Error;

    /// Prepends an entry, dropping the oldest ones beyond capacity.
    fn add_entry(&self, entry: NewActivityEntry) -> Result<ActivityEntry, Self::Error>;

    /// Removes every entry.
    fn clear_log(&self) -> Result<(), Self::Error>;

    /// All retained entries, newest first.
    fn entries(&self) -> Result<Vec<ActivityEntry>, Self::Error>;
}

/// Process-local activity log.
#[derive(Debug)]
pub struct MemoryActivityLog {
    inner: Mutex<MemoryLogState>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct MemoryLogState {
    entries: VecDeque<ActivityEntry>,
    next_id: i64,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::with_capacity(ACTIVITY_LOG_CAPACITY)
    }

    /// Creates a log that keeps at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(MemoryLogState::default()),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityLog for MemoryActivityLog {
    type Error = Infallible;

    fn add_entry(&self, entry: NewActivityEntry) -> Result<ActivityEntry, Self::Error> {
        let mut state = self.inner.lock();
        state.next_id += 1;

        let stored = ActivityEntry {
            id: state.next_id,
            target: entry.target,
            detected_count: entry.detected_count,
            blocked_count: entry.blocked_count,
            auto_stop_enabled: entry.auto_stop_enabled,
            created_at: Utc::now(),
        };

        state.entries.push_front(stored.clone());
        state.entries.truncate(self.capacity);

        Ok(stored)
    }

    fn clear_log(&self) -> Result<(), Self::Error> {
        self.inner.lock().entries.clear();
        Ok(())
    }

    fn entries(&self) -> Result<Vec<ActivityEntry>, Self::Error> {
        Ok(self.inner.lock().entries.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(target: &str) -> NewActivityEntry {
        NewActivityEntry {
            target: target.to_string(),
            detected_count: 1,
            blocked_count: 1,
            auto_stop_enabled: true,
        }
    }

    #[test]
    fn newest_first() {
        let log = MemoryActivityLog::new();
        log.add_entry(entry("first")).unwrap();
        log.add_entry(entry("second")).unwrap();

        let targets: Vec<_> = log
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.target)
            .collect();
        assert_eq!(targets, ["second", "first"]);
    }

    #[test]
    fn capped_at_capacity() {
        let log = MemoryActivityLog::new();
        for i in 0..(ACTIVITY_LOG_CAPACITY + 5) {
            log.add_entry(entry(&format!("scan {i}"))).unwrap();
        }

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), ACTIVITY_LOG_CAPACITY);
        assert_eq!(entries[0].target, format!("scan {}", ACTIVITY_LOG_CAPACITY + 4));
        assert_eq!(entries.last().unwrap().target, "scan 5");
    }

    #[test]
    fn ids_increase() {
        let log = MemoryActivityLog::new();
        let a = log.add_entry(entry("a")).unwrap();
        let b = log.add_entry(entry("b")).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn clear_empties_log() {
        let log = MemoryActivityLog::with_capacity(3);
        log.add_entry(entry("a")).unwrap();
        assert!(!log.is_empty());

        log.clear_log().unwrap();
        assert!(log.is_empty());
        assert!(log.entries().unwrap().is_empty());
    }
}
