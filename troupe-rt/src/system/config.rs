// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::ask::AskConfig;
use crate::observe::{
    InMemoryMetrics, InMemoryTracer, LogSink, MetricsSink, TraceSink, TracingLogger,
};

/// Actor system configuration.
///
/// Recognized options: the ask profile, the dead-letter queue bound, and
/// the three observability sinks. Every sink has a default implementation
/// (in-memory metrics and tracing, `tracing`-backed logging) and can be
/// swapped for any other implementation of the port.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use troupe_rt::ask::AskConfig;
/// use troupe_rt::observe::NoopMetrics;
/// use troupe_rt::system::SystemConfig;
///
/// let config = SystemConfig::default()
///     .with_ask(AskConfig::production())
///     .with_dead_letter_queue_max_size(500)
///     .with_metrics(Arc::new(NoopMetrics));
/// assert_eq!(config.dead_letter_queue_max_size, 500);
/// ```
#[derive(Clone)]
pub struct SystemConfig {
    pub ask: AskConfig,
    /// Dead-letter queue capacity; oldest entries are evicted on overflow.
    pub dead_letter_queue_max_size: usize,
    pub metrics: Arc<dyn MetricsSink>,
    pub tracer: Arc<dyn TraceSink>,
    pub logger: Arc<dyn LogSink>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            ask: AskConfig::default(),
            dead_letter_queue_max_size: 1000,
            metrics: Arc::new(InMemoryMetrics::new()),
            tracer: Arc::new(InMemoryTracer::new()),
            logger: Arc::new(TracingLogger),
        }
    }
}

impl SystemConfig {
    pub fn with_ask(mut self, ask: AskConfig) -> Self {
        self.ask = ask;
        self
    }

    pub fn with_dead_letter_queue_max_size(mut self, max_size: usize) -> Self {
        self.dead_letter_queue_max_size = max_size;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn TraceSink>) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn LogSink>) -> Self {
        self.logger = logger;
        self
    }
}
