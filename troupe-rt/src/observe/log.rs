// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

// Layer 3: Internal module imports
use crate::util::ActorId;

/// Log severity levels recognized by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// One runtime log record.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Path of the actor the record concerns, when there is one.
    pub actor: Option<String>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            actor: None,
        }
    }

    pub fn with_actor(mut self, actor: &ActorId) -> Self {
        self.actor = Some(actor.as_str().to_owned());
        self
    }
}

/// Sink for runtime log records.
pub trait LogSink: Send + Sync + 'static {
    fn record(&self, record: LogRecord);
}

/// Default log sink: forwards records to the `tracing` crate at the
/// matching level, tagging the actor path when present.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl LogSink for TracingLogger {
    fn record(&self, record: LogRecord) {
        let actor = record.actor.as_deref().unwrap_or("-");
        match record.level {
            LogLevel::Debug => tracing::debug!(actor, "{}", record.message),
            LogLevel::Info => tracing::info!(actor, "{}", record.message),
            LogLevel::Warning => tracing::warn!(actor, "{}", record.message),
            LogLevel::Error => tracing::error!(actor, "{}", record.message),
        }
    }
}

/// Log sink that buffers records in memory.
#[derive(Default)]
pub struct InMemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl InMemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn count_at(&self, level: LogLevel) -> usize {
        self.records.lock().iter().filter(|r| r.level == level).count()
    }
}

impl LogSink for InMemoryLogger {
    fn record(&self, record: LogRecord) {
        self.records.lock().push(record);
    }
}
