// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounded audit log of executed remote commands.
//!
//! Each [`RemoteShellSession`](super::RemoteShellSession) owns one
//! [`CommandLog`]; every command that reaches the wire appends exactly one
//! [`LogEntry`].

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;

/// Default maximum number of entries kept per session
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Timestamp format used when entries are rendered for callers
const LOG_TIME_FORMAT: &str = "%H:%M:%S";

/// Record of a single remote command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// When the command finished
    pub timestamp: DateTime<Local>,
    /// Command text as sent to the host
    pub command: String,
    /// stdout on success, stderr on failure
    pub response: String,
    /// Remote exit status was 0
    pub success: bool,
    /// Set only for failures
    pub error_message: Option<String>,
}

impl LogEntry {
    /// Record a successful execution
    pub fn succeeded(command: impl Into<String>, stdout: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            command: command.into(),
            response: stdout.into(),
            success: true,
            error_message: None,
        }
    }

    /// Record a failed execution
    pub fn failed(
        command: impl Into<String>,
        response: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            command: command.into(),
            response: response.into(),
            success: false,
            error_message: Some(error_message.into()),
        }
    }

    /// Caller-facing view with a formatted timestamp
    pub fn view(&self) -> LogEntryView {
        LogEntryView {
            timestamp: self.timestamp.format(LOG_TIME_FORMAT).to_string(),
            command: self.command.clone(),
            response: self.response.clone(),
            success: self.success,
            error_message: self.error_message.clone(),
        }
    }
}

/// Serializable form of a [`LogEntry`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntryView {
    pub timestamp: String,
    pub command: String,
    pub response: String,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Fixed-capacity ring of [`LogEntry`] values.
///
/// Uses a `VecDeque` with FIFO eviction once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct CommandLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl CommandLog {
    /// Create a log holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest if the log is full
    pub fn append(&mut self, entry: LogEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Copy of all entries, oldest first
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommandLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_log_basic() {
        let mut log = CommandLog::new(5);
        assert!(log.is_empty());

        log.append(LogEntry::succeeded("echo 1", "1"));
        assert_eq!(log.len(), 1);
        assert!(!log.is_empty());
    }

    #[test]
    fn test_command_log_fifo() {
        let mut log = CommandLog::new(3);

        for i in 1..=5 {
            log.append(LogEntry::succeeded(format!("cmd {i}"), ""));
        }

        assert_eq!(log.len(), 3);

        let commands: Vec<_> = log.snapshot().into_iter().map(|e| e.command).collect();
        assert_eq!(commands, vec!["cmd 3", "cmd 4", "cmd 5"]);
    }

    #[test]
    fn test_default_capacity_bounds_log() {
        let mut log = CommandLog::default();
        for i in 0..250 {
            log.append(LogEntry::succeeded(format!("cmd {i}"), ""));
            assert!(log.len() <= DEFAULT_LOG_CAPACITY);
        }

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 100);
        assert_eq!(snapshot.first().unwrap().command, "cmd 150");
        assert_eq!(snapshot.last().unwrap().command, "cmd 249");
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut log = CommandLog::new(10);
        log.append(LogEntry::succeeded("first", ""));

        let snapshot = log.snapshot();
        log.append(LogEntry::succeeded("second", ""));
        log.clear();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].command, "first");
    }

    #[test]
    fn test_entry_view() {
        let entry = LogEntry::failed("hal_app --se_enum", "boom", "boom");
        let view = entry.view();

        assert_eq!(view.timestamp.len(), 8);
        assert!(!view.success);
        assert_eq!(view.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut log = CommandLog::new(0);
        log.append(LogEntry::succeeded("a", ""));
        log.append(LogEntry::succeeded("b", ""));
        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].command, "b");
    }
}
