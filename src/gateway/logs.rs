//! Bounded in-memory log buffer
//!
//! Every gateway log call lands here regardless of configuration, so the
//! status view always sees the true recent history. Whether an entry is also
//! written to the console is decided by the caller (see
//! [`LogEntry::mirror`]).

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::LogLevel;

/// Entries kept before the oldest are dropped
pub const LOG_BUFFER_CAPACITY: usize = 50;

/// Entries returned by a status query
pub const STATUS_LOG_COUNT: usize = 10;

/// One gateway log line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// When it was recorded
    pub timestamp: DateTime<Utc>,
    /// Severity
    pub level: LogLevel,
    /// Human-readable message
    pub message: String,
    /// Structured context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl LogEntry {
    /// Create an entry stamped now
    pub fn new(level: LogLevel, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            data,
        }
    }

    /// Write this entry to the console through `tracing`
    pub fn mirror(&self) {
        let data = self.data.as_ref().map(ToString::to_string).unwrap_or_default();
        match self.level {
            LogLevel::Debug => debug!(data = %data, "{}", self.message),
            LogLevel::Info => info!(data = %data, "{}", self.message),
            LogLevel::Warn => warn!(data = %data, "{}", self.message),
            LogLevel::Error => error!(data = %data, "{}", self.message),
        }
    }
}

/// Fixed-capacity ring of [`LogEntry`]
#[derive(Debug)]
pub struct LogBuffer {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl LogBuffer {
    /// Create a buffer holding at most `capacity` entries
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append, dropping the oldest entry when full
    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        if self.capacity > 0 {
            entries.push_back(entry);
        }
    }

    /// Up to `count` most recent entries, newest first
    #[must_use]
    pub fn recent(&self, count: usize) -> Vec<LogEntry> {
        self.entries.lock().iter().rev().take(count).cloned().collect()
    }

    /// Drop everything
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of buffered entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(LOG_BUFFER_CAPACITY)
    }
}
