use std::collections::VecDeque;

use chrono::{DateTime, Local};
use sm_core::{GroupTotals, LogEntry};

/// Bounded rolling history of group totals, oldest dropped first.
///
/// # Example
/// ```
/// use sm_audio::event_log::EventLog;
/// use sm_core::GroupTotals;
///
/// let mut log = EventLog::new(2);
/// for _ in 0..3 {
///     log.append(chrono::Local::now(), GroupTotals::default());
/// }
/// assert_eq!(log.len(), 2);
/// ```
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl EventLog {
    /// Create an empty log holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push an entry at the tail, dropping from the head past capacity.
    pub fn append(&mut self, timestamp: DateTime<Local>, totals: GroupTotals) {
        self.entries.push_back(LogEntry { timestamp, totals });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Entries, most recent last.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Owned copy, most recent last.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
