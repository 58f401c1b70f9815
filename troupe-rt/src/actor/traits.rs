// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use super::context::ActorContext;
use crate::message::Payload;

/// Factory producing fresh behavior instances; retained for restarts.
pub type ActorFactory = Arc<dyn Fn() -> Box<dyn Actor> + Send + Sync>;

/// An actor behavior: private state plus a message handler.
///
/// The runtime guarantees that at most one `handle` invocation per actor is
/// in progress at any time, and that envelopes are delivered in enqueue
/// order. Handlers may await freely (including `ask`s to other actors); the
/// pump keeps scheduling other actors while a handler is suspended.
///
/// Messages arrive as an opaque [`Payload`]; the handler downcasts at its
/// boundary. An `Err` return is routed to the parent supervisor, or stops
/// the actor when it has none.
///
/// # Example
/// ```rust
/// use async_trait::async_trait;
/// use troupe_rt::actor::{Actor, ActorContext};
/// use troupe_rt::message::Payload;
///
/// #[derive(Default)]
/// struct Counter {
///     count: u64,
/// }
///
/// #[async_trait]
/// impl Actor for Counter {
///     async fn handle(&mut self, message: Payload, ctx: &ActorContext) -> anyhow::Result<()> {
///         match message.downcast_ref::<&str>() {
///             Some(&"increment") => self.count += 1,
///             Some(&"get") => ctx.reply(self.count),
///             _ => {}
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Actor: Send + 'static {
    /// Process one message.
    async fn handle(&mut self, message: Payload, ctx: &ActorContext) -> anyhow::Result<()>;

    /// Lifecycle hook invoked after the context is wired, before the first
    /// message. Failing here aborts the spawn.
    async fn pre_start(&mut self, _ctx: &ActorContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Lifecycle hook invoked while the actor is being stopped.
    async fn post_stop(&mut self, _ctx: &ActorContext) -> anyhow::Result<()> {
        Ok(())
    }
}
