//! Cooperative message pump.
//!
//! One logical pump services every actor in the system. Mailboxes with
//! pending envelopes sit in a FIFO ready queue; the pump takes the front
//! mailbox, dequeues one envelope, and launches the handler as a detached
//! task. The handler is never awaited inline, so an actor that `ask`s
//! itself (directly or through a chain) cannot deadlock the pump.
//!
//! Per-actor sequential execution is enforced by the in-flight set: a
//! mailbox is never re-queued while a handler for its actor is still
//! running, and the completion path re-schedules the mailbox only at the
//! tail of the ready queue, which also gives fairness across busy actors.

// Layer 1: Standard library imports
use std::any::Any;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

// Layer 2: Third-party crate imports
use anyhow::anyhow;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Notify;

// Layer 3: Internal module imports
use crate::deadletter::DeadLetter;
use crate::mailbox::Mailbox;
use crate::message::Envelope;
use crate::observe::{events, names, LogLevel, LogRecord, TraceEvent};
use crate::system::{ActorSystem, SystemShared};
use crate::util::ActorId;

struct PumpState {
    ready: VecDeque<Arc<Mailbox>>,
    queued: HashSet<ActorId>,
    in_flight: HashSet<ActorId>,
    shutdown: bool,
}

/// Scheduling state shared between mailboxes and the pump.
pub struct Dispatcher {
    state: Mutex<PumpState>,
    wake: Notify,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PumpState {
                ready: VecDeque::new(),
                queued: HashSet::new(),
                in_flight: HashSet::new(),
                shutdown: false,
            }),
            wake: Notify::new(),
        }
    }

    /// Enqueue a mailbox onto the ready queue.
    ///
    /// No-op when the mailbox is already queued or its actor has a handler
    /// in flight; the completion path re-schedules in the latter case.
    pub fn schedule(&self, mailbox: &Arc<Mailbox>) {
        {
            let mut state = self.state.lock();
            if state.shutdown {
                return;
            }
            let id = mailbox.actor_id();
            if state.queued.contains(id) || state.in_flight.contains(id) {
                return;
            }
            state.queued.insert(id.clone());
            state.ready.push_back(Arc::clone(mailbox));
        }
        self.wake.notify_one();
    }

    /// Take the next ready mailbox, marking its actor in flight.
    ///
    /// Parks on the wake signal while the ready queue is empty. Returns
    /// `None` once the dispatcher is shut down.
    pub(crate) async fn acquire_next(&self) -> Option<Arc<Mailbox>> {
        loop {
            {
                let mut state = self.state.lock();
                if state.shutdown {
                    return None;
                }
                while let Some(mailbox) = state.ready.pop_front() {
                    state.queued.remove(mailbox.actor_id());
                    if mailbox.is_disposed() {
                        continue;
                    }
                    state.in_flight.insert(mailbox.actor_id().clone());
                    return Some(mailbox);
                }
            }
            self.wake.notified().await;
        }
    }

    pub(crate) fn clear_in_flight(&self, id: &ActorId) {
        self.state.lock().in_flight.remove(id);
    }

    /// Whether a handler for the actor is currently running.
    pub fn is_in_flight(&self, id: &ActorId) -> bool {
        self.state.lock().in_flight.contains(id)
    }

    /// Number of mailboxes currently in the ready queue.
    pub fn ready_len(&self) -> usize {
        self.state.lock().ready.len()
    }

    /// Release the wake signal and make the pump exit.
    pub fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.wake.notify_one();
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shutdown
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Pump loop: runs until the dispatcher shuts down.
pub(crate) async fn run_pump(shared: Arc<SystemShared>) {
    loop {
        let Some(mailbox) = shared.dispatcher.acquire_next().await else {
            return;
        };
        match mailbox.dequeue() {
            Some(envelope) => dispatch_envelope(&shared, mailbox, envelope),
            None => {
                // Raced with disposal or a concurrent drain; release the
                // actor and re-check for messages that slipped in while it
                // was marked in flight.
                let id = mailbox.actor_id().clone();
                shared.dispatcher.clear_in_flight(&id);
                if !mailbox.is_disposed() && !mailbox.is_empty() {
                    shared.dispatcher.schedule(&mailbox);
                }
            }
        }
    }
}

/// Dispatch one envelope to its actor as a detached handler task.
fn dispatch_envelope(shared: &Arc<SystemShared>, mailbox: Arc<Mailbox>, envelope: Envelope) {
    let actor_id = mailbox.actor_id().clone();
    let Some(cell) = shared.cell(&actor_id) else {
        // The actor was removed between enqueue and dispatch.
        shared.dispatcher.clear_in_flight(&actor_id);
        shared.dead_letters.push(DeadLetter::new(envelope, actor_id));
        return;
    };

    let started = Instant::now();
    cell.context
        .begin_message(envelope.sender().cloned(), envelope.correlation_id());
    shared.tracer.record(TraceEvent::new(
        envelope.correlation_id(),
        events::PROCESSED,
        actor_id.as_str(),
        envelope.payload().type_name(),
    ));

    let behavior = Arc::clone(&cell.behavior);
    let context = Arc::clone(&cell.context);
    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        let payload = envelope.into_payload();
        let outcome = std::panic::AssertUnwindSafe(async {
            let mut behavior = behavior.lock().await;
            behavior.handle(payload, &context).await
        })
        .catch_unwind()
        .await;
        let result = match outcome {
            Ok(result) => result,
            Err(panic) => Err(anyhow!(
                "message handler panicked: {}",
                panic_message(panic.as_ref())
            )),
        };

        shared.metrics.timing(
            names::MESSAGES_PROCESSING_TIME,
            started.elapsed(),
            Some(&[("actorId", actor_id.as_str())]),
        );
        shared.metrics.increment(
            names::MESSAGES_PROCESSED,
            1,
            Some(&[("actorId", actor_id.as_str())]),
        );
        context.end_message();
        shared.dispatcher.clear_in_flight(&actor_id);

        if let Err(error) = result {
            shared.metrics.increment(
                names::ACTORS_FAILED,
                1,
                Some(&[("actorId", actor_id.as_str())]),
            );
            shared.logger.record(
                LogRecord::new(LogLevel::Error, format!("message handler failed: {error:#}"))
                    .with_actor(&actor_id),
            );
            ActorSystem::from_shared(Arc::clone(&shared))
                .handle_failure(&actor_id, &error)
                .await;
        }

        if !mailbox.is_disposed() && !mailbox.is_empty() {
            shared.dispatcher.schedule(&mailbox);
        }
    });
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
