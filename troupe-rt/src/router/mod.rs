//! Worker pools with routing.
//!
//! A pool is a supervisor actor that spawns `N` workers from one factory
//! and forwards every received message to the next worker per the routing
//! strategy. The original sender is preserved on the forwarded envelope, so
//! replies bypass the router.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use rand::Rng;

// Layer 3: Internal module imports
use crate::actor::{Actor, ActorContext};
use crate::message::{Envelope, Payload};
use crate::util::ActorId;

/// How a pool picks the worker for the next message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingStrategy {
    /// Cycle through workers `0..N-1` with a wrap-around counter.
    #[default]
    RoundRobin,
    /// Pick a worker uniformly at random.
    Random,
}

/// Pool configuration: worker count plus routing strategy.
///
/// # Example
/// ```rust
/// use troupe_rt::router::{RouterConfig, RoutingStrategy};
///
/// let config = RouterConfig::new(4).with_strategy(RoutingStrategy::Random);
/// assert_eq!(config.size, 4);
/// ```
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub size: usize,
    pub strategy: RoutingStrategy,
}

impl RouterConfig {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            strategy: RoutingStrategy::RoundRobin,
        }
    }

    pub fn with_strategy(mut self, strategy: RoutingStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// The router's own behavior: forward each message to the next worker.
///
/// Workers are addressed by id rather than by reference so that a restarted
/// worker (fresh reference, same id) keeps receiving traffic.
pub(crate) struct RouterBehavior {
    workers: Vec<ActorId>,
    next: usize,
    strategy: RoutingStrategy,
}

impl RouterBehavior {
    pub fn new(workers: Vec<ActorId>, strategy: RoutingStrategy) -> Self {
        Self {
            workers,
            next: 0,
            strategy,
        }
    }

    fn next_index(&mut self) -> usize {
        match self.strategy {
            RoutingStrategy::RoundRobin => {
                let index = self.next % self.workers.len();
                self.next = self.next.wrapping_add(1);
                index
            }
            RoutingStrategy::Random => rand::thread_rng().gen_range(0..self.workers.len()),
        }
    }
}

#[async_trait]
impl Actor for RouterBehavior {
    async fn handle(&mut self, message: Payload, ctx: &ActorContext) -> anyhow::Result<()> {
        if self.workers.is_empty() {
            anyhow::bail!("router '{}' has no workers", ctx.actor_id());
        }
        let index = self.next_index();
        let worker = self.workers[index].clone();
        let Some(system) = ctx.system() else {
            return Ok(());
        };

        let mut envelope = Envelope::new(message).with_sender_opt(ctx.sender());
        if let Some(correlation_id) = ctx.correlation_id() {
            envelope = envelope.with_correlation_id(correlation_id);
        }
        match system.get(&worker) {
            Some(actor_ref) => actor_ref.tell_envelope(envelope),
            // Mid-restart gap: the worker id is momentarily unregistered.
            None => system.dead_letter(envelope, worker),
        }
        Ok(())
    }
}
