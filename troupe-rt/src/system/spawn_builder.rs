// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::actor_system::ActorSystem;
use super::error::SystemError;
use crate::actor::{ActorFactory, ActorRef};
use crate::router::RouterConfig;
use crate::supervision::SupervisionStrategy;
use crate::util::ActorId;

/// Builder for spawns that need more than the defaults.
///
/// # Example
/// ```rust,ignore
/// let workers = system
///     .spawn_builder("workers", Worker::default)
///     .with_strategy(Arc::new(OneForOneStrategy::new(3, None)))
///     .with_pool(RouterConfig::new(4))
///     .spawn()
///     .await?;
/// ```
pub struct SpawnBuilder {
    system: ActorSystem,
    id: ActorId,
    factory: ActorFactory,
    strategy: Option<Arc<dyn SupervisionStrategy>>,
    pool: Option<RouterConfig>,
}

impl SpawnBuilder {
    pub(crate) fn new(system: ActorSystem, id: ActorId, factory: ActorFactory) -> Self {
        Self {
            system,
            id,
            factory,
            strategy: None,
            pool: None,
        }
    }

    /// Register the actor with a supervision strategy; retained for
    /// restarts.
    pub fn with_strategy(mut self, strategy: Arc<dyn SupervisionStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Spawn a router pool of workers instead of a single actor.
    pub fn with_pool(mut self, pool: RouterConfig) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Execute the spawn.
    pub async fn spawn(self) -> Result<ActorRef, SystemError> {
        match self.pool {
            Some(pool) => {
                self.system
                    .spawn_pool_cell(self.id, self.factory, pool, self.strategy)
                    .await
            }
            None => {
                self.system
                    .spawn_cell(self.id, self.factory, self.strategy)
                    .await
            }
        }
    }
}
