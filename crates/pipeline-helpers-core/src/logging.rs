// crates/pipeline-helpers-core/src/logging.rs
// ============================================================================
// Module: Structured Logging
// Description: JSON-lines log records and pluggable sinks for task output.
// Purpose: Emit machine-readable progress and failure logs from every task.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every task logs through a [`Logger`], which stamps records with the task
//! name and drops records below its minimum level before handing them to a
//! [`LogSink`]. Sinks serialize one JSON object per line; write failures are
//! swallowed so logging never aborts a task.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::timestamp::unix_millis_now;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Diagnostic detail, enabled by `DEBUG_LEVEL=1`.
    Debug,
    /// Normal progress.
    Info,
    /// Degraded but recoverable behavior.
    Warning,
    /// Task failure.
    Error,
}

/// One structured log record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    /// Event identifier.
    pub event: &'static str,
    /// Record timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Severity.
    pub level: LogLevel,
    /// Task that emitted the record.
    pub task: String,
    /// Human-readable message.
    pub message: String,
    /// Structured fields, omitted when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Map<String, Value>>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(level: LogLevel, task: &str, message: &str, fields: Option<Map<String, Value>>) -> Self {
        Self {
            event: "pipeline_log",
            timestamp_ms: unix_millis_now(),
            level,
            task: task.to_string(),
            message: message.to_string(),
            fields: fields.filter(|fields| !fields.is_empty()),
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for log records.
pub trait LogSink: Send + Sync {
    /// Records a log entry.
    fn record(&self, record: &LogRecord);
}

/// Sink that writes JSON lines to stderr.
pub struct StderrLogSink;

impl LogSink for StderrLogSink {
    fn record(&self, record: &LogRecord) {
        if let Ok(payload) = serde_json::to_string(record) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileLogSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileLogSink {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl LogSink for FileLogSink {
    fn record(&self, record: &LogRecord) {
        if let Ok(payload) = serde_json::to_string(record)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Sink that keeps records in memory for assertions.
#[derive(Default)]
pub struct MemoryLogSink {
    /// Captured records in emission order.
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of captured records.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().map(|records| records.clone()).unwrap_or_default()
    }
}

impl LogSink for MemoryLogSink {
    fn record(&self, record: &LogRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}

// ============================================================================
// SECTION: Logger
// ============================================================================

/// Task-scoped logger with a minimum level.
#[derive(Clone)]
pub struct Logger {
    /// Destination sink.
    sink: Arc<dyn LogSink>,
    /// Task name stamped on each record.
    task: String,
    /// Records below this level are dropped.
    min_level: LogLevel,
}

impl Logger {
    /// Creates a logger for a task.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>, task: &str, min_level: LogLevel) -> Self {
        Self {
            sink,
            task: task.to_string(),
            min_level,
        }
    }

    /// Creates a logger writing to stderr at info level.
    #[must_use]
    pub fn stderr(task: &str) -> Self {
        Self::new(Arc::new(StderrLogSink), task, LogLevel::Info)
    }

    /// Returns the task name.
    #[must_use]
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Returns true when records at `level` are emitted.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// Emits a record with optional structured fields.
    pub fn log(&self, level: LogLevel, message: &str, fields: Option<Map<String, Value>>) {
        if self.enabled(level) {
            self.sink.record(&LogRecord::new(level, &self.task, message, fields));
        }
    }

    /// Emits a debug record.
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message, None);
    }

    /// Emits an info record.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, None);
    }

    /// Emits a warning record.
    pub fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message, None);
    }

    /// Emits an error record.
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message, None);
    }

    /// Emits a record with fields built from `(name, value)` pairs.
    pub fn with_fields<I, K>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        if self.enabled(level) {
            let fields = fields.into_iter().map(|(key, value)| (key.into(), value)).collect();
            self.sink.record(&LogRecord::new(level, &self.task, message, Some(fields)));
        }
    }
}
