use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityLevel::Info => write!(f, "info"),
            ActivityLevel::Success => write!(f, "success"),
            ActivityLevel::Warning => write!(f, "warning"),
            ActivityLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    /// Increases by one per entry for the life of the log.
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub level: ActivityLevel,
    pub message: String,
}

/// Operator-facing log of recent engine events. Oldest entries fall off once
/// `cap` is reached.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    cap: usize,
    next_seq: u64,
}

impl ActivityLog {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            entries: VecDeque::with_capacity(cap),
            cap,
            next_seq: 1,
        }
    }

    pub fn push(&mut self, level: ActivityLevel, message: impl Into<String>) {
        if self.entries.len() == self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(ActivityEntry {
            seq: self.next_seq,
            at: Utc::now(),
            level,
            message: message.into(),
        });
        self.next_seq += 1;
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(ActivityLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(ActivityLevel::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(ActivityLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ActivityLevel::Error, message);
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn count(&self, level: ActivityLevel) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_entries_are_dropped_at_cap() {
        let mut log = ActivityLog::new(3);
        for i in 0..5 {
            log.info(format!("line {i}"));
        }

        let messages: Vec<_> = log.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["line 2", "line 3", "line 4"]);
        assert_eq!(log.entries()[0].seq, 3);
    }

    #[test]
    fn counts_by_level() {
        let mut log = ActivityLog::new(10);
        log.info("scanning");
        log.success("1 verified leads");
        log.error("timeout");

        assert_eq!(log.count(ActivityLevel::Success), 1);
        assert_eq!(log.count(ActivityLevel::Warning), 0);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn zero_cap_keeps_one_line() {
        let mut log = ActivityLog::new(0);
        log.info("a");
        log.info("b");
        assert_eq!(log.len(), 1);
    }
}
