//! # troupe-rt - In-Process Actor Runtime
//!
//! A single-process, in-memory actor runtime: application code models
//! concurrent state as isolated actors that communicate exclusively by
//! asynchronous message passing over a cooperative message pump.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use troupe_rt::prelude::*;
//! use async_trait::async_trait;
//!
//! #[derive(Default)]
//! struct Counter {
//!     count: u64,
//! }
//!
//! #[async_trait]
//! impl Actor for Counter {
//!     async fn handle(&mut self, message: Payload, ctx: &ActorContext) -> anyhow::Result<()> {
//!         match message.downcast_ref::<&str>() {
//!             Some(&"increment") => self.count += 1,
//!             Some(&"get") => ctx.reply(self.count),
//!             _ => {}
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SystemError> {
//!     let system = ActorSystem::new(SystemConfig::default());
//!     let counter = system.spawn("counter", Counter::default).await?;
//!
//!     counter.tell("increment", None);
//!     let count: u64 = counter.ask("get", None).await.unwrap();
//!     assert_eq!(count, 1);
//!
//!     system.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Execution Model
//!
//! One logical message pump services every mailbox. The pump dequeues one
//! envelope per turn and launches the handler as a detached task, so an
//! actor awaiting an `ask` never blocks the pump. Per actor, at most one
//! handler runs at a time and envelopes arrive in enqueue order; across
//! actors there is no ordering guarantee.
//!
//! # Module Organization
//!
//! ## Core
//! - [`actor`] - Behavior trait, references, and the per-actor context
//! - [`message`] - Envelopes and the opaque payload carrier
//! - [`mailbox`] - Per-actor FIFO queues
//! - [`dispatch`] - The cooperative message pump
//!
//! ## Protocols
//! - [`ask`] - Request/response with timeouts, retries, and backoff
//! - [`timer`] - Per-actor keyed timers bound to the actor's lifetime
//! - [`bus`] - Type-routed publish/subscribe
//! - [`router`] - Worker pools with round-robin or random routing
//!
//! ## Fault Tolerance & Infrastructure
//! - [`supervision`] - Strategies and the supervisor actor
//! - [`deadletter`] - Bounded queue of undeliverable envelopes
//! - [`observe`] - Metrics, trace, and log ports with default sinks
//! - [`system`] - ActorSystem configuration and lifecycle

pub mod actor;
pub mod ask;
pub mod bus;
pub mod deadletter;
pub mod dispatch;
pub mod mailbox;
pub mod message;
pub mod observe;
pub mod prelude;
pub mod router;
pub mod supervision;
pub mod system;
pub mod timer;
pub mod util;

// Re-export commonly used types
pub use actor::{Actor, ActorContext, ActorRef, Terminated};
pub use ask::{AskConfig, AskError, AskErrorKind};
pub use bus::{BusEvent, EventBus};
pub use deadletter::{DeadLetter, DeadLetterQueue};
pub use message::{Envelope, Payload};
pub use observe::{
    InMemoryLogger, InMemoryMetrics, InMemoryTracer, LogLevel, LogRecord, LogSink, MetricsSink,
    NoopMetrics, NoopTracer, TraceEvent, TraceSink, TracingLogger,
};
pub use router::{RouterConfig, RoutingStrategy};
pub use supervision::{
    AllForOneStrategy, OneForOneStrategy, SupervisionDecision, SupervisionStrategy, Supervisor,
};
pub use system::{ActorSystem, SpawnBuilder, SystemConfig, SystemError};
pub use timer::TimerScheduler;
pub use util::ActorId;
