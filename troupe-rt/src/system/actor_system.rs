//! Main actor system: registry, lifecycle, and the wiring of dispatcher,
//! event bus, dead-letter queue, and observability sinks.

// Layer 1: Standard library
use std::sync::Arc;

// Layer 2: Third-party
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

// Layer 3: Internal
use super::config::SystemConfig;
use super::error::SystemError;
use super::spawn_builder::SpawnBuilder;
use crate::actor::{Actor, ActorContext, ActorFactory, ActorRef, Terminated};
use crate::bus::EventBus;
use crate::deadletter::{DeadLetter, DeadLetterQueue};
use crate::dispatch::{run_pump, Dispatcher};
use crate::mailbox::Mailbox;
use crate::message::{Envelope, Payload};
use crate::observe::{names, LogLevel, LogRecord, LogSink, MetricsSink, TraceSink};
use crate::router::{RouterBehavior, RouterConfig};
use crate::supervision::{
    OneForOneStrategy, SupervisionDecision, SupervisionStrategy, Supervisor, SupervisorBehavior,
    SupervisorCell,
};
use crate::timer::TimerScheduler;
use crate::util::ActorId;

/// System state enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SystemState {
    /// System is running normally
    Running,
    /// Graceful shutdown in progress
    ShuttingDown,
    /// System has stopped
    Stopped,
}

/// Everything the registry retains for one spawned actor.
#[derive(Clone)]
pub(crate) struct ActorCell {
    pub actor_ref: ActorRef,
    pub mailbox: Arc<Mailbox>,
    pub behavior: Arc<AsyncMutex<Box<dyn Actor>>>,
    pub context: Arc<ActorContext>,
    /// Retained for restarts.
    pub factory: ActorFactory,
    /// Retained for restarts.
    pub strategy: Option<Arc<dyn SupervisionStrategy>>,
}

/// Shared state behind every [`ActorSystem`] clone.
///
/// All registries and sinks hang off this instance; nothing is process
/// global, so multiple independent systems can coexist in one process.
pub(crate) struct SystemShared {
    pub config: SystemConfig,
    pub registry: DashMap<ActorId, ActorCell>,
    pub supervisors: DashMap<ActorId, Arc<SupervisorCell>>,
    pub dispatcher: Arc<Dispatcher>,
    pub bus: EventBus,
    pub dead_letters: DeadLetterQueue,
    pub metrics: Arc<dyn MetricsSink>,
    pub tracer: Arc<dyn TraceSink>,
    pub logger: Arc<dyn LogSink>,
    state: RwLock<SystemState>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl SystemShared {
    pub(crate) fn cell(&self, id: &ActorId) -> Option<ActorCell> {
        self.registry.get(id).map(|entry| entry.value().clone())
    }
}

/// The actor system.
///
/// Owns the registry, the message pump, the event bus, and the dead-letter
/// queue. Cheap to clone; all clones share one instance.
///
/// # Example
/// ```rust,ignore
/// use troupe_rt::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> Result<(), SystemError> {
///     let system = ActorSystem::new(SystemConfig::default());
///     let counter = system.spawn("counter", Counter::default).await?;
///
///     counter.tell("increment", None);
///     let count: u64 = counter.ask("get", None).await.unwrap();
///
///     system.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct ActorSystem {
    pub(crate) inner: Arc<SystemShared>,
}

impl Clone for ActorSystem {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ActorSystem {
    /// Create a system and start its message pump.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(config: SystemConfig) -> Self {
        let metrics = Arc::clone(&config.metrics);
        let tracer = Arc::clone(&config.tracer);
        let logger = Arc::clone(&config.logger);
        let dead_letters =
            DeadLetterQueue::new(config.dead_letter_queue_max_size, Arc::clone(&metrics));

        let inner = Arc::new(SystemShared {
            config,
            registry: DashMap::new(),
            supervisors: DashMap::new(),
            dispatcher: Arc::new(Dispatcher::new()),
            bus: EventBus::new(),
            dead_letters,
            metrics,
            tracer,
            logger,
            state: RwLock::new(SystemState::Running),
            pump: Mutex::new(None),
        });

        let pump_handle = tokio::spawn(run_pump(Arc::clone(&inner)));
        *inner.pump.lock() = Some(pump_handle);

        Self { inner }
    }

    pub(crate) fn from_shared(inner: Arc<SystemShared>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.inner.config
    }

    pub fn is_running(&self) -> bool {
        *self.inner.state.read() == SystemState::Running
    }

    /// Number of registered actors.
    pub fn actor_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// The system event bus.
    pub fn event_bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// The system dead-letter queue.
    pub fn dead_letters(&self) -> &DeadLetterQueue {
        &self.inner.dead_letters
    }

    /// Registry lookup. Returns `None` for unknown ids and always once the
    /// system is no longer running.
    pub fn get(&self, id: &ActorId) -> Option<ActorRef> {
        if !self.is_running() {
            return None;
        }
        self.inner
            .registry
            .get(id)
            .map(|entry| entry.actor_ref.clone())
    }

    /// Spawn a top-level actor.
    pub async fn spawn<F, A>(
        &self,
        id: impl Into<ActorId>,
        factory: F,
    ) -> Result<ActorRef, SystemError>
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: Actor,
    {
        let factory: ActorFactory = Arc::new(move || Box::new(factory()) as Box<dyn Actor>);
        self.spawn_cell(id.into(), factory, None).await
    }

    /// Begin a configurable spawn (supervision strategy, worker pool).
    pub fn spawn_builder<F, A>(&self, id: impl Into<ActorId>, factory: F) -> SpawnBuilder
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: Actor,
    {
        let factory: ActorFactory = Arc::new(move || Box::new(factory()) as Box<dyn Actor>);
        SpawnBuilder::new(self.clone(), id.into(), factory)
    }

    /// Spawn a worker pool fronted by a routing supervisor.
    pub async fn spawn_pool<F, A>(
        &self,
        id: impl Into<ActorId>,
        factory: F,
        config: RouterConfig,
    ) -> Result<ActorRef, SystemError>
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: Actor,
    {
        let factory: ActorFactory = Arc::new(move || Box::new(factory()) as Box<dyn Actor>);
        self.spawn_pool_cell(id.into(), factory, config, None).await
    }

    /// Spawn a supervisor actor with the given strategy.
    pub async fn spawn_supervisor(
        &self,
        id: impl Into<ActorId>,
        strategy: Arc<dyn SupervisionStrategy>,
    ) -> Result<Supervisor, SystemError> {
        let id = id.into();
        let actor_ref = self
            .spawn_cell(
                id.clone(),
                Arc::new(|| Box::new(SupervisorBehavior) as Box<dyn Actor>),
                None,
            )
            .await?;
        let cell = Arc::new(SupervisorCell::new(id.clone(), strategy));
        self.inner.supervisors.insert(id, Arc::clone(&cell));
        Ok(Supervisor::new(actor_ref, cell, self.clone()))
    }

    /// Core spawn path: build behavior, mailbox, reference, and context;
    /// run `pre_start` after the back-edges are installed; then register.
    pub(crate) async fn spawn_cell(
        &self,
        id: ActorId,
        factory: ActorFactory,
        strategy: Option<Arc<dyn SupervisionStrategy>>,
    ) -> Result<ActorRef, SystemError> {
        if !self.is_running() {
            return Err(SystemError::ShutDown);
        }
        if self.inner.registry.contains_key(&id) {
            return Err(SystemError::IdCollision { id });
        }

        let behavior: Arc<AsyncMutex<Box<dyn Actor>>> = Arc::new(AsyncMutex::new(factory()));
        let mailbox = Arc::new(Mailbox::new(
            id.clone(),
            Arc::clone(&self.inner.dispatcher),
            Arc::clone(&self.inner.metrics),
        ));
        let actor_ref = ActorRef::local(
            id.clone(),
            Arc::clone(&mailbox),
            Arc::downgrade(&self.inner),
        );
        let timers = TimerScheduler::new(actor_ref.clone());
        let context = Arc::new(ActorContext::new(
            actor_ref.clone(),
            Arc::downgrade(&self.inner),
            timers,
        ));

        {
            let mut guard = behavior.lock().await;
            if let Err(source) = guard.pre_start(&context).await {
                context.timers().dispose();
                actor_ref.kill();
                mailbox.dispose();
                return Err(SystemError::PreStartFailed { id, source });
            }
        }

        let cell = ActorCell {
            actor_ref: actor_ref.clone(),
            mailbox: Arc::clone(&mailbox),
            behavior,
            context,
            factory,
            strategy,
        };
        match self.inner.registry.entry(id.clone()) {
            Entry::Occupied(_) => {
                // A racing spawn won between the collision check and here.
                cell.context.timers().dispose();
                actor_ref.kill();
                mailbox.dispose();
                return Err(SystemError::IdCollision { id });
            }
            Entry::Vacant(vacant) => {
                vacant.insert(cell);
            }
        }

        self.inner.metrics.increment(
            names::ACTORS_SPAWNED,
            1,
            Some(&[("actorId", id.as_str())]),
        );
        self.inner
            .metrics
            .gauge(names::ACTORS_ACTIVE, self.inner.registry.len() as f64, None);
        self.inner
            .logger
            .record(LogRecord::new(LogLevel::Debug, "actor spawned").with_actor(&id));
        Ok(actor_ref)
    }

    pub(crate) async fn spawn_pool_cell(
        &self,
        id: ActorId,
        factory: ActorFactory,
        config: RouterConfig,
        strategy: Option<Arc<dyn SupervisionStrategy>>,
    ) -> Result<ActorRef, SystemError> {
        if !self.is_running() {
            return Err(SystemError::ShutDown);
        }
        if self.inner.registry.contains_key(&id) {
            return Err(SystemError::IdCollision { id });
        }

        let strategy: Arc<dyn SupervisionStrategy> =
            strategy.unwrap_or_else(|| Arc::new(OneForOneStrategy::always_restart()));
        let cell = Arc::new(SupervisorCell::new(id.clone(), Arc::clone(&strategy)));
        self.inner.supervisors.insert(id.clone(), Arc::clone(&cell));

        let mut workers = Vec::with_capacity(config.size);
        for index in 0..config.size {
            let worker_id = id.child(&index.to_string());
            match self
                .spawn_cell(
                    worker_id.clone(),
                    Arc::clone(&factory),
                    Some(Arc::clone(&strategy)),
                )
                .await
            {
                Ok(actor_ref) => {
                    cell.track(worker_id.clone(), actor_ref, Arc::clone(&factory));
                    workers.push(worker_id);
                }
                Err(error) => {
                    self.abort_pool(&id, &workers).await;
                    return Err(error);
                }
            }
        }

        let routing = config.strategy;
        let router_factory: ActorFactory =
            Arc::new(move || Box::new(RouterBehavior::new(workers.clone(), routing)) as Box<dyn Actor>);
        match self.spawn_cell(id.clone(), router_factory, None).await {
            Ok(router_ref) => Ok(router_ref),
            Err(error) => {
                let workers: Vec<ActorId> =
                    cell.children.lock().keys().cloned().collect();
                self.abort_pool(&id, &workers).await;
                Err(error)
            }
        }
    }

    async fn abort_pool(&self, id: &ActorId, workers: &[ActorId]) {
        for worker in workers {
            if let Some(actor_ref) = self.get(worker) {
                let _ = self.stop(&actor_ref).await;
            }
        }
        self.inner.supervisors.remove(id);
    }

    /// Stop an actor: dispose timers, run `post_stop`, clean bus
    /// subscriptions, kill the reference, dispose the mailbox, notify
    /// watchers, and deregister.
    ///
    /// Stopping a reference that is not in the registry posts a dead-letter
    /// entry noting the unknown recipient.
    pub async fn stop(&self, actor: &ActorRef) -> Result<(), SystemError> {
        let id = actor.id().clone();
        let Some((_, cell)) = self.inner.registry.remove(&id) else {
            let notice = Envelope::new(Payload::new(format!(
                "stop requested for unknown actor '{id}'"
            )));
            self.inner.dead_letters.push(DeadLetter::new(notice, id));
            return Ok(());
        };
        self.stop_cell(cell).await;
        Ok(())
    }

    async fn stop_cell(&self, cell: ActorCell) {
        let id = cell.actor_ref.id().clone();

        cell.context.timers().dispose();
        {
            let mut behavior = cell.behavior.lock().await;
            if let Err(error) = behavior.post_stop(&cell.context).await {
                self.inner.metrics.increment(
                    names::ACTORS_STOP_FAILED,
                    1,
                    Some(&[("actorId", id.as_str())]),
                );
                self.inner.logger.record(
                    LogRecord::new(LogLevel::Warning, format!("post_stop failed: {error:#}"))
                        .with_actor(&id),
                );
            }
        }
        self.inner.bus.cleanup(&id);
        cell.actor_ref.kill();
        cell.mailbox.dispose();
        for watcher in cell.actor_ref.take_watchers() {
            watcher.tell(Terminated(cell.actor_ref.clone()), None);
        }
        self.inner.supervisors.remove(&id);

        self.inner.metrics.increment(
            names::ACTORS_STOPPED,
            1,
            Some(&[("actorId", id.as_str())]),
        );
        self.inner
            .metrics
            .gauge(names::ACTORS_ACTIVE, self.inner.registry.len() as f64, None);
        self.inner
            .logger
            .record(LogRecord::new(LogLevel::Debug, "actor stopped").with_actor(&id));
    }

    /// Stop and respawn an actor from its retained factory and strategy.
    ///
    /// The prior state is lost; sends during the gap become dead letters.
    /// A restarted supervisor gets its supervision cell re-created with the
    /// same strategy (stop drops the old one), so it keeps arbitrating
    /// failures of both surviving and newly supervised children.
    pub async fn restart(&self, id: &ActorId) -> Result<ActorRef, SystemError> {
        let (actor_ref, factory, strategy) = {
            let cell = self
                .inner
                .registry
                .get(id)
                .ok_or_else(|| SystemError::UnknownActor { id: id.clone() })?;
            (
                cell.actor_ref.clone(),
                Arc::clone(&cell.factory),
                cell.strategy.clone(),
            )
        };
        let supervisor_strategy = self
            .inner
            .supervisors
            .get(id)
            .map(|entry| Arc::clone(&entry.value().strategy));
        self.stop(&actor_ref).await?;
        let new_ref = self.spawn_cell(id.clone(), factory, strategy).await?;
        if let Some(strategy) = supervisor_strategy {
            self.inner.supervisors.insert(
                id.clone(),
                Arc::new(SupervisorCell::new(id.clone(), strategy)),
            );
        }
        self.inner.metrics.increment(
            names::ACTORS_RESTARTED,
            1,
            Some(&[("actorId", id.as_str())]),
        );
        Ok(new_ref)
    }

    /// Shut the system down: stop the pump, stop every actor, clear the
    /// registries, dispose the dead-letter queue and event bus.
    pub async fn shutdown(&self) -> Result<(), SystemError> {
        {
            let mut state = self.inner.state.write();
            if *state != SystemState::Running {
                return Err(SystemError::ShutDown);
            }
            *state = SystemState::ShuttingDown;
        }

        self.inner.dispatcher.shutdown();
        let pump = self.inner.pump.lock().take();
        if let Some(handle) = pump {
            let _ = handle.await;
        }

        let ids: Vec<ActorId> = self
            .inner
            .registry
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for id in ids {
            if let Some((_, cell)) = self.inner.registry.remove(&id) {
                self.stop_cell(cell).await;
            }
        }
        self.inner.supervisors.clear();
        self.inner.bus.dispose();
        self.inner.dead_letters.dispose();

        self.inner
            .metrics
            .increment(names::SYSTEM_SHUTDOWN, 1, None);
        self.inner.metrics.gauge(names::ACTORS_ACTIVE, 0.0, None);
        self.inner
            .logger
            .record(LogRecord::new(LogLevel::Info, "actor system shut down"));
        *self.inner.state.write() = SystemState::Stopped;
        Ok(())
    }

    /// Publish an event on the system event bus.
    pub fn publish<E: Send + Sync + 'static>(&self, event: E) -> usize {
        self.inner.bus.publish(event)
    }

    /// Subscribe an actor to events of type `E`.
    pub fn subscribe<E: Send + Sync + 'static>(&self, subscriber: &ActorRef) {
        self.inner.bus.subscribe::<E>(subscriber);
    }

    /// Route a handler failure to the nearest supervisor up the id chain.
    ///
    /// Escalation walks upward: each escalating supervisor becomes the
    /// failing child of its own parent. With no supervisor anywhere on the
    /// chain the failed actor is stopped.
    pub(crate) async fn handle_failure(&self, failed: &ActorId, error: &anyhow::Error) {
        let mut failing = failed.clone();
        loop {
            let supervisor = failing.parent().and_then(|parent| {
                self.inner
                    .supervisors
                    .get(&parent)
                    .map(|entry| Arc::clone(entry.value()))
            });
            let Some(cell) = supervisor else {
                if let Some(actor_ref) = self.get(failed) {
                    let _ = self.stop(&actor_ref).await;
                }
                return;
            };

            let decision = cell.strategy.handle(&failing, error);
            if decision == SupervisionDecision::Escalate {
                failing = cell.id.clone();
                continue;
            }
            cell.apply(self, decision, &failing).await;
            return;
        }
    }

    /// Post an undeliverable envelope to the dead-letter queue.
    pub(crate) fn dead_letter(&self, envelope: Envelope, recipient: ActorId) {
        self.inner
            .dead_letters
            .push(DeadLetter::new(envelope, recipient));
    }

    pub(crate) fn log(&self, record: LogRecord) {
        self.inner.logger.record(record);
    }
}
