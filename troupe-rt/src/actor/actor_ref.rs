// Layer 1: Standard library imports
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use uuid::Uuid;

// Layer 3: Internal module imports
use crate::ask::{AskError, ReplySlot};
use crate::deadletter::DeadLetter;
use crate::mailbox::Mailbox;
use crate::message::Envelope;
use crate::observe::{events, TraceEvent};
use crate::system::SystemShared;
use crate::util::ActorId;

/// System-emitted notice delivered to watchers when a watched actor stops.
#[derive(Debug, Clone)]
pub struct Terminated(pub ActorRef);

enum RefTarget {
    /// A spawned actor: its mailbox plus a non-owning system hook.
    Local {
        mailbox: Arc<Mailbox>,
        system: Weak<SystemShared>,
    },
    /// A single-use ask reply handle.
    Reply { slot: ReplySlot },
}

struct ActorRefInner {
    id: ActorId,
    target: RefTarget,
    alive: AtomicBool,
    watchers: Mutex<Vec<ActorRef>>,
}

/// Stable, lightweight handle to an actor.
///
/// Cloning is cheap and never transfers ownership of the actor. A reference
/// goes from alive to not-alive exactly once; `tell` on a not-alive
/// reference routes the envelope to the dead-letter queue.
#[derive(Clone)]
pub struct ActorRef {
    inner: Arc<ActorRefInner>,
}

impl ActorRef {
    pub(crate) fn local(id: ActorId, mailbox: Arc<Mailbox>, system: Weak<SystemShared>) -> Self {
        Self {
            inner: Arc::new(ActorRefInner {
                id,
                target: RefTarget::Local { mailbox, system },
                alive: AtomicBool::new(true),
                watchers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Allocate a reply handle with a synthetic unique id.
    pub(crate) fn reply_handle(slot: ReplySlot) -> Self {
        Self {
            inner: Arc::new(ActorRefInner {
                id: ActorId::new(format!("ask:{}", Uuid::new_v4())),
                target: RefTarget::Reply { slot },
                alive: AtomicBool::new(true),
                watchers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> &ActorId {
        &self.inner.id
    }

    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::Acquire)
    }

    pub(crate) fn is_reply_handle(&self) -> bool {
        matches!(self.inner.target, RefTarget::Reply { .. })
    }

    /// One-way liveness transition.
    pub(crate) fn kill(&self) {
        self.inner.alive.store(false, Ordering::Release);
    }

    pub(crate) fn system_shared(&self) -> Option<Arc<SystemShared>> {
        match &self.inner.target {
            RefTarget::Local { system, .. } => system.upgrade(),
            RefTarget::Reply { .. } => None,
        }
    }

    /// Send a message.
    ///
    /// The message is wrapped into an envelope (an envelope value passes
    /// through with its correlation id intact). When `sender` is provided it
    /// replaces the envelope's sender. A `sent` trace event is emitted and
    /// the envelope enqueued; if the reference is not alive the envelope
    /// goes to the dead-letter queue instead.
    pub fn tell<M: Send + Sync + 'static>(&self, message: M, sender: Option<ActorRef>) {
        let envelope = Envelope::from_message(message);
        let envelope = match sender {
            Some(sender) => envelope.with_sender(sender),
            None => envelope,
        };
        self.tell_envelope(envelope);
    }

    /// Send a pre-built envelope. Same delivery rules as [`ActorRef::tell`].
    pub fn tell_envelope(&self, envelope: Envelope) {
        match &self.inner.target {
            RefTarget::Reply { slot } => {
                if self.is_alive() {
                    slot.complete_with_envelope(envelope);
                    self.kill();
                }
            }
            RefTarget::Local { mailbox, system } => {
                let Some(shared) = system.upgrade() else {
                    return;
                };
                if !self.is_alive() {
                    shared
                        .dead_letters
                        .push(DeadLetter::new(envelope, self.inner.id.clone()));
                    return;
                }
                shared.tracer.record(TraceEvent::new(
                    envelope.correlation_id(),
                    events::SENT,
                    self.inner.id.as_str(),
                    envelope.payload().type_name(),
                ));
                if let Err(envelope) = mailbox.enqueue(envelope) {
                    // Disposed between the liveness check and the enqueue.
                    shared
                        .dead_letters
                        .push(DeadLetter::new(envelope, self.inner.id.clone()));
                }
            }
        }
    }

    /// Request/response: send `message` and await a reply of type `T`.
    ///
    /// Per-attempt timeout defaults to the system's ask configuration;
    /// timeouts are retried with exponential backoff per that configuration.
    pub async fn ask<T, M>(&self, message: M, timeout: Option<Duration>) -> Result<T, AskError>
    where
        T: Clone + Send + Sync + 'static,
        M: Send + Sync + 'static,
    {
        crate::ask::run_ask::<T, M>(self, message, timeout).await
    }

    /// Register `watcher` to receive a [`Terminated`] notice when this actor
    /// stops. Watching an already-stopped actor notifies immediately.
    pub fn watch(&self, watcher: &ActorRef) -> Result<(), AskError> {
        if self.is_reply_handle() {
            return Err(AskError::Unsupported { operation: "watch" });
        }
        if !self.is_alive() {
            watcher.tell(Terminated(self.clone()), None);
            return Ok(());
        }
        let mut watchers = self.inner.watchers.lock();
        if !watchers.iter().any(|w| w.id() == watcher.id()) {
            watchers.push(watcher.clone());
        }
        Ok(())
    }

    /// Drain the watcher set for terminal notification.
    pub(crate) fn take_watchers(&self) -> Vec<ActorRef> {
        std::mem::take(&mut *self.inner.watchers.lock())
    }

    /// Stop a reply handle, resolving its slot with a cancellation error if
    /// it is still pending.
    pub(crate) fn stop_reply_handle(&self) {
        if let RefTarget::Reply { slot } = &self.inner.target {
            slot.cancel();
            self.kill();
        }
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ActorRef {}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("id", &self.inner.id.as_str())
            .field("alive", &self.is_alive())
            .finish()
    }
}
