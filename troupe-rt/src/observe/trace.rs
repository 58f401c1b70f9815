// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

// Layer 3: Internal module imports
// (none)

/// Trace event names emitted by the runtime.
pub mod events {
    pub const SENT: &str = "sent";
    pub const PROCESSED: &str = "processed";
    pub const ASK_ATTEMPT: &str = "ask_attempt";
    pub const ASK_RETRY: &str = "ask_retry";
    pub const ASK_FAILED_NON_RETRYABLE: &str = "ask_failed_non_retryable";
    pub const ASK_FAILED_FINAL: &str = "ask_failed_final";
}

/// One message-level trace event.
///
/// The correlation id threads a logical request through `sent`,
/// `processed`, and the ask lifecycle events.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub correlation_id: Uuid,
    pub event_name: &'static str,
    /// Path of the actor the event concerns.
    pub actor: String,
    /// Concrete type name of the payload involved.
    pub payload_type: String,
    /// Attempt number, for ask lifecycle events.
    pub attempt: Option<u32>,
    /// Per-attempt timeout, for ask lifecycle events.
    pub timeout: Option<Duration>,
    pub timestamp: DateTime<Utc>,
}

impl TraceEvent {
    pub fn new(
        correlation_id: Uuid,
        event_name: &'static str,
        actor: impl Into<String>,
        payload_type: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id,
            event_name,
            actor: actor.into(),
            payload_type: payload_type.into(),
            attempt: None,
            timeout: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Sink for trace events.
pub trait TraceSink: Send + Sync + 'static {
    fn record(&self, event: TraceEvent);
}

/// Trace sink that buffers events in memory.
#[derive(Default)]
pub struct InMemoryTracer {
    events: Mutex<Vec<TraceEvent>>,
}

impl InMemoryTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, in record order.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    /// Number of events recorded under a given name.
    pub fn count(&self, event_name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_name == event_name)
            .count()
    }
}

impl TraceSink for InMemoryTracer {
    fn record(&self, event: TraceEvent) {
        self.events.lock().push(event);
    }
}

/// Trace sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl TraceSink for NoopTracer {
    fn record(&self, _event: TraceEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_tracer_records_in_order() {
        let tracer = InMemoryTracer::new();
        let id = Uuid::new_v4();
        tracer.record(TraceEvent::new(id, events::SENT, "a", "u8"));
        tracer.record(TraceEvent::new(id, events::PROCESSED, "a", "u8"));

        let recorded = tracer.events();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].event_name, events::SENT);
        assert_eq!(recorded[1].event_name, events::PROCESSED);
        assert_eq!(recorded[1].correlation_id, id);
    }

    #[test]
    fn test_count_filters_by_name() {
        let tracer = InMemoryTracer::new();
        let id = Uuid::new_v4();
        tracer.record(
            TraceEvent::new(id, events::ASK_ATTEMPT, "t", "Ping").with_attempt(1),
        );
        tracer.record(
            TraceEvent::new(id, events::ASK_RETRY, "t", "Ping").with_attempt(1),
        );
        tracer.record(
            TraceEvent::new(id, events::ASK_ATTEMPT, "t", "Ping").with_attempt(2),
        );
        assert_eq!(tracer.count(events::ASK_ATTEMPT), 2);
        assert_eq!(tracer.count(events::ASK_RETRY), 1);
        assert_eq!(tracer.count(events::ASK_FAILED_FINAL), 0);
    }

    #[test]
    fn test_builder_attaches_attempt_and_timeout() {
        let event = TraceEvent::new(Uuid::new_v4(), events::ASK_ATTEMPT, "t", "Ping")
            .with_attempt(3)
            .with_timeout(Duration::from_millis(50));
        assert_eq!(event.attempt, Some(3));
        assert_eq!(event.timeout, Some(Duration::from_millis(50)));
    }
}
