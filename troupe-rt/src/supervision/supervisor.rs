// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::strategy::{SupervisionDecision, SupervisionStrategy};
use crate::actor::{Actor, ActorContext, ActorFactory, ActorRef};
use crate::message::Payload;
use crate::observe::{LogLevel, LogRecord};
use crate::system::{ActorSystem, SystemError};
use crate::util::ActorId;

pub(crate) struct ChildSpec {
    pub actor_ref: ActorRef,
    pub factory: ActorFactory,
}

/// Supervision bookkeeping for one supervisor: its strategy plus the
/// children it owns, keyed by child id.
pub(crate) struct SupervisorCell {
    pub id: ActorId,
    pub strategy: Arc<dyn SupervisionStrategy>,
    pub children: Mutex<HashMap<ActorId, ChildSpec>>,
}

impl SupervisorCell {
    pub fn new(id: ActorId, strategy: Arc<dyn SupervisionStrategy>) -> Self {
        Self {
            id,
            strategy,
            children: Mutex::new(HashMap::new()),
        }
    }

    pub fn track(&self, child: ActorId, actor_ref: ActorRef, factory: ActorFactory) {
        self.children
            .lock()
            .insert(child, ChildSpec { actor_ref, factory });
    }

    /// Apply a (non-escalate) decision for a failed child.
    pub async fn apply(
        &self,
        system: &ActorSystem,
        decision: SupervisionDecision,
        failed: &ActorId,
    ) {
        match decision {
            SupervisionDecision::Resume | SupervisionDecision::Escalate => {}
            SupervisionDecision::Stop => {
                if let Some(actor_ref) = system.get(failed) {
                    let _ = system.stop(&actor_ref).await;
                }
                self.children.lock().remove(failed);
            }
            SupervisionDecision::Restart => {
                if self.strategy.restart_all() {
                    let tracked: Vec<ActorId> =
                        self.children.lock().keys().cloned().collect();
                    for child in tracked {
                        self.restart_child(system, &child).await;
                    }
                } else {
                    self.restart_child(system, failed).await;
                }
            }
        }
    }

    async fn restart_child(&self, system: &ActorSystem, child: &ActorId) {
        match system.restart(child).await {
            Ok(new_ref) => {
                if let Some(spec) = self.children.lock().get_mut(child) {
                    spec.actor_ref = new_ref;
                }
            }
            Err(error) => {
                system.log(
                    LogRecord::new(
                        LogLevel::Warning,
                        format!("failed to restart child: {error}"),
                    )
                    .with_actor(child),
                );
            }
        }
    }
}

/// Behavior installed for a supervisor's own actor.
///
/// Child failures are routed through the system rather than the mailbox, so
/// the behavior itself only logs stray messages.
pub(crate) struct SupervisorBehavior;

#[async_trait]
impl Actor for SupervisorBehavior {
    async fn handle(&mut self, message: Payload, ctx: &ActorContext) -> anyhow::Result<()> {
        if let Some(system) = ctx.system() {
            system.log(
                LogRecord::new(
                    LogLevel::Debug,
                    format!("supervisor ignoring message of type {}", message.type_name()),
                )
                .with_actor(ctx.actor_id()),
            );
        }
        Ok(())
    }
}

/// Handle to a spawned supervisor.
///
/// A supervisor owns children spawned through [`Supervisor::supervise`],
/// registered under `supervisor_id/name` with the supervisor's strategy.
/// When a child's handler fails the strategy decides: restart the child
/// (or, for all-for-one, every child), stop it, resume, or escalate to the
/// supervisor's own parent.
pub struct Supervisor {
    actor_ref: ActorRef,
    cell: Arc<SupervisorCell>,
    system: ActorSystem,
}

impl Supervisor {
    pub(crate) fn new(actor_ref: ActorRef, cell: Arc<SupervisorCell>, system: ActorSystem) -> Self {
        Self {
            actor_ref,
            cell,
            system,
        }
    }

    /// Spawn a child under `supervisor_id/name`, retaining the factory for
    /// restarts.
    pub async fn supervise<F, A>(&self, name: &str, factory: F) -> Result<ActorRef, SystemError>
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: Actor,
    {
        let factory: ActorFactory = Arc::new(move || Box::new(factory()) as Box<dyn Actor>);
        let child_id = self.cell.id.child(name);
        let actor_ref = self
            .system
            .spawn_cell(
                child_id.clone(),
                Arc::clone(&factory),
                Some(Arc::clone(&self.cell.strategy)),
            )
            .await?;
        self.cell.track(child_id, actor_ref.clone(), factory);
        Ok(actor_ref)
    }

    /// Stop a supervised child and drop it from tracking.
    pub async fn stop_child(&self, name: &str) -> Result<(), SystemError> {
        let child_id = self.cell.id.child(name);
        let removed = self.cell.children.lock().remove(&child_id);
        match removed {
            Some(spec) => self.system.stop(&spec.actor_ref).await,
            None => Err(SystemError::UnknownActor { id: child_id }),
        }
    }

    /// The supervisor's own reference.
    pub fn actor_ref(&self) -> &ActorRef {
        &self.actor_ref
    }

    pub fn id(&self) -> &ActorId {
        &self.cell.id
    }

    /// Ids of the currently tracked children.
    pub fn children(&self) -> Vec<ActorId> {
        self.cell.children.lock().keys().cloned().collect()
    }

    /// Current reference for a tracked child.
    pub fn child_ref(&self, name: &str) -> Option<ActorRef> {
        let child_id = self.cell.id.child(name);
        self.cell
            .children
            .lock()
            .get(&child_id)
            .map(|spec| spec.actor_ref.clone())
    }
}
