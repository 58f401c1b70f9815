//! Observability ports consumed by the kernel.
//!
//! Three narrow sinks: [`MetricsSink`] for counters/gauges/timings,
//! [`TraceSink`] for per-message trace events, and [`LogSink`] for runtime
//! log records. Each has an in-memory implementation for tests and
//! diagnostics, a no-op implementation, and (for logging) a default backed
//! by the `tracing` crate. Implementations are swappable via
//! [`crate::system::SystemConfig`].

pub mod log;
pub mod metrics;
pub mod trace;

pub use log::{InMemoryLogger, LogLevel, LogRecord, LogSink, TracingLogger};
pub use metrics::{names, InMemoryMetrics, MetricsSink, NoopMetrics, Tags};
pub use trace::{events, InMemoryTracer, NoopTracer, TraceEvent, TraceSink};
