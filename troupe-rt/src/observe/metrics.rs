// Layer 1: Standard library imports
use std::collections::HashMap;
use std::time::Duration;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
// (none)

/// Metric names emitted by the runtime.
pub mod names {
    pub const ACTORS_SPAWNED: &str = "actors.spawned";
    pub const ACTORS_STOPPED: &str = "actors.stopped";
    pub const ACTORS_FAILED: &str = "actors.failed";
    pub const ACTORS_RESTARTED: &str = "actors.restarted";
    pub const ACTORS_STOP_FAILED: &str = "actors.stop_failed";
    pub const ACTORS_ACTIVE: &str = "actors.active";
    pub const MESSAGES_PROCESSED: &str = "messages.processed";
    pub const MESSAGES_PROCESSING_TIME: &str = "messages.processing_time";
    pub const MAILBOX_SIZE: &str = "mailbox.size";
    pub const DEAD_LETTERS: &str = "dead_letters";
    pub const DEAD_LETTERS_EVICTED: &str = "dead_letters.evicted";
    pub const SYSTEM_SHUTDOWN: &str = "system.shutdown";
}

/// Metric tag pairs, e.g. `&[("actorId", "counter")]`.
pub type Tags<'a> = &'a [(&'a str, &'a str)];

/// Sink for counters, gauges, and timings.
///
/// The kernel emits a fixed vocabulary of names (see [`names`]); back-ends
/// are free to map them onto statsd, Prometheus, or anything else. All
/// methods must be cheap and non-blocking from the caller's perspective.
pub trait MetricsSink: Send + Sync + 'static {
    /// Increment a counter.
    fn increment(&self, name: &str, count: u64, tags: Option<Tags<'_>>);

    /// Decrement a counter.
    fn decrement(&self, name: &str, count: u64, tags: Option<Tags<'_>>);

    /// Record the current value of a gauge.
    fn gauge(&self, name: &str, value: f64, tags: Option<Tags<'_>>);

    /// Record an observed duration.
    fn timing(&self, name: &str, duration: Duration, tags: Option<Tags<'_>>);
}

fn keyed(name: &str, tags: Option<Tags<'_>>) -> String {
    match tags {
        Some(tags) if !tags.is_empty() => {
            let mut pairs: Vec<String> =
                tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
            pairs.sort();
            format!("{name}|{}", pairs.join(","))
        }
        _ => name.to_owned(),
    }
}

/// In-memory metrics sink.
///
/// The default sink; keeps everything in maps keyed by name plus sorted
/// tags, which makes assertions in tests straightforward.
#[derive(Default)]
pub struct InMemoryMetrics {
    counters: Mutex<HashMap<String, i64>>,
    gauges: Mutex<HashMap<String, f64>>,
    timings: Mutex<HashMap<String, Vec<Duration>>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of a counter across all tag combinations.
    pub fn counter(&self, name: &str) -> i64 {
        let prefix = format!("{name}|");
        self.counters
            .lock()
            .iter()
            .filter(|(key, _)| *key == name || key.starts_with(&prefix))
            .map(|(_, value)| *value)
            .sum()
    }

    /// Counter value for one exact tag combination.
    pub fn tagged_counter(&self, name: &str, tags: Tags<'_>) -> i64 {
        self.counters
            .lock()
            .get(&keyed(name, Some(tags)))
            .copied()
            .unwrap_or(0)
    }

    /// Latest gauge value for the untagged name.
    pub fn gauge_value(&self, name: &str) -> Option<f64> {
        self.gauges.lock().get(name).copied()
    }

    /// Latest gauge value for one exact tag combination.
    pub fn tagged_gauge(&self, name: &str, tags: Tags<'_>) -> Option<f64> {
        self.gauges.lock().get(&keyed(name, Some(tags))).copied()
    }

    /// Number of recorded timings across all tag combinations.
    pub fn timing_count(&self, name: &str) -> usize {
        let prefix = format!("{name}|");
        self.timings
            .lock()
            .iter()
            .filter(|(key, _)| *key == name || key.starts_with(&prefix))
            .map(|(_, values)| values.len())
            .sum()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn increment(&self, name: &str, count: u64, tags: Option<Tags<'_>>) {
        *self.counters.lock().entry(keyed(name, tags)).or_insert(0) += count as i64;
    }

    fn decrement(&self, name: &str, count: u64, tags: Option<Tags<'_>>) {
        *self.counters.lock().entry(keyed(name, tags)).or_insert(0) -= count as i64;
    }

    fn gauge(&self, name: &str, value: f64, tags: Option<Tags<'_>>) {
        self.gauges.lock().insert(keyed(name, tags), value);
    }

    fn timing(&self, name: &str, duration: Duration, tags: Option<Tags<'_>>) {
        self.timings
            .lock()
            .entry(keyed(name, tags))
            .or_default()
            .push(duration);
    }
}

/// Metrics sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment(&self, _name: &str, _count: u64, _tags: Option<Tags<'_>>) {}
    fn decrement(&self, _name: &str, _count: u64, _tags: Option<Tags<'_>>) {}
    fn gauge(&self, _name: &str, _value: f64, _tags: Option<Tags<'_>>) {}
    fn timing(&self, _name: &str, _duration: Duration, _tags: Option<Tags<'_>>) {}
}
