// Layer 1: Standard library imports
use std::sync::Weak;
use std::time::Duration;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use uuid::Uuid;

// Layer 3: Internal module imports
use super::actor_ref::ActorRef;
use super::traits::Actor;
use crate::ask::AskError;
use crate::system::{ActorSystem, SystemError, SystemShared};
use crate::timer::TimerScheduler;
use crate::util::ActorId;

struct CurrentMessage {
    sender: Option<ActorRef>,
    correlation_id: Uuid,
}

/// Per-actor execution context.
///
/// Provides the actor's own reference, a non-owning handle to the system,
/// the current message's sender (valid only for the duration of one handler
/// invocation), and the actor's own timer scheduler.
///
/// The system owns the actor; the context's back-references never do, which
/// is what breaks the actor/context/system reference cycle.
pub struct ActorContext {
    self_ref: ActorRef,
    system: Weak<SystemShared>,
    current: Mutex<Option<CurrentMessage>>,
    timers: TimerScheduler,
}

impl ActorContext {
    pub(crate) fn new(
        self_ref: ActorRef,
        system: Weak<SystemShared>,
        timers: TimerScheduler,
    ) -> Self {
        Self {
            self_ref,
            system,
            current: Mutex::new(None),
            timers,
        }
    }

    /// The actor's own reference.
    pub fn self_ref(&self) -> &ActorRef {
        &self.self_ref
    }

    pub fn actor_id(&self) -> &ActorId {
        self.self_ref.id()
    }

    /// The owning system, unless it has been dropped.
    pub fn system(&self) -> Option<ActorSystem> {
        self.system.upgrade().map(ActorSystem::from_shared)
    }

    /// Sender of the message currently being handled.
    ///
    /// `None` outside a handler invocation or for sender-less messages
    /// (timers, bare tells).
    pub fn sender(&self) -> Option<ActorRef> {
        self.current.lock().as_ref().and_then(|m| m.sender.clone())
    }

    /// Correlation id of the message currently being handled.
    pub fn correlation_id(&self) -> Option<Uuid> {
        self.current.lock().as_ref().map(|m| m.correlation_id)
    }

    /// The actor's timer scheduler; its lifetime is bound to the actor.
    pub fn timers(&self) -> &TimerScheduler {
        &self.timers
    }

    /// Tell `target`, stamping this actor as the sender.
    pub fn tell<M: Send + Sync + 'static>(&self, target: &ActorRef, message: M) {
        target.tell(message, Some(self.self_ref.clone()));
    }

    /// Reply to the current message's sender, if there is one.
    pub fn reply<M: Send + Sync + 'static>(&self, message: M) {
        if let Some(sender) = self.sender() {
            sender.tell(message, Some(self.self_ref.clone()));
        }
    }

    /// Ask `target` and await a typed reply.
    pub async fn ask<T, M>(
        &self,
        target: &ActorRef,
        message: M,
        timeout: Option<Duration>,
    ) -> Result<T, AskError>
    where
        T: Clone + Send + Sync + 'static,
        M: Send + Sync + 'static,
    {
        target.ask(message, timeout).await
    }

    /// Publish an event on the system event bus.
    pub fn publish<E: Send + Sync + 'static>(&self, event: E) -> Result<usize, SystemError> {
        let shared = self.system.upgrade().ok_or(SystemError::ShutDown)?;
        Ok(shared.bus.publish(event))
    }

    /// Subscribe this actor to events of type `E`.
    pub fn subscribe<E: Send + Sync + 'static>(&self) -> Result<(), SystemError> {
        let shared = self.system.upgrade().ok_or(SystemError::ShutDown)?;
        shared.bus.subscribe::<E>(&self.self_ref);
        Ok(())
    }

    /// Unsubscribe this actor from events of type `E`.
    pub fn unsubscribe<E: Send + Sync + 'static>(&self) -> Result<(), SystemError> {
        let shared = self.system.upgrade().ok_or(SystemError::ShutDown)?;
        shared.bus.unsubscribe::<E>(&self.self_ref);
        Ok(())
    }

    /// Spawn a child actor under `self_id/name`.
    pub async fn spawn_child<F, A>(&self, name: &str, factory: F) -> Result<ActorRef, SystemError>
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: Actor,
    {
        let system = self.system().ok_or(SystemError::ShutDown)?;
        system.spawn(self.actor_id().child(name), factory).await
    }

    /// Request this actor's own stop.
    ///
    /// The stop is deferred to a separate task so it takes effect after the
    /// current handler invocation completes.
    pub fn stop_self(&self) {
        let Some(system) = self.system() else {
            return;
        };
        let self_ref = self.self_ref.clone();
        tokio::spawn(async move {
            let _ = system.stop(&self_ref).await;
        });
    }

    /// Install the per-invocation message info. Called by the dispatcher
    /// immediately before the handler is launched.
    pub(crate) fn begin_message(&self, sender: Option<ActorRef>, correlation_id: Uuid) {
        *self.current.lock() = Some(CurrentMessage {
            sender,
            correlation_id,
        });
    }

    /// Reset the sender slot to "none". Called when the handler resolves,
    /// on success and on every error path alike.
    pub(crate) fn end_message(&self) {
        *self.current.lock() = None;
    }
}
