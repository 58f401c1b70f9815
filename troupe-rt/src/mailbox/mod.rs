//! Per-actor FIFO mailbox.

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::dispatch::Dispatcher;
use crate::message::Envelope;
use crate::observe::{names, MetricsSink};
use crate::util::ActorId;

/// FIFO queue of envelopes bound to exactly one actor.
///
/// Every effective enqueue publishes the queue depth as the `mailbox.size`
/// gauge (tagged with the actor id) and asks the dispatcher to schedule this
/// mailbox. Disposal is one-way: a disposed mailbox drops its backlog and
/// ignores further enqueues, which the caller turns into dead letters.
pub struct Mailbox {
    actor_id: ActorId,
    queue: Mutex<VecDeque<Envelope>>,
    disposed: AtomicBool,
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<dyn MetricsSink>,
}

impl Mailbox {
    pub fn new(
        actor_id: ActorId,
        dispatcher: Arc<Dispatcher>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            actor_id,
            queue: Mutex::new(VecDeque::new()),
            disposed: AtomicBool::new(false),
            dispatcher,
            metrics,
        }
    }

    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    /// Append an envelope and request scheduling.
    ///
    /// A disposed mailbox hands the envelope back; the caller routes it to
    /// the dead-letter queue.
    pub fn enqueue(self: &Arc<Self>, envelope: Envelope) -> Result<(), Envelope> {
        if self.is_disposed() {
            return Err(envelope);
        }
        let depth = {
            let mut queue = self.queue.lock();
            // Disposal may have raced in; the queue is cleared under this
            // lock, so re-check before inserting.
            if self.is_disposed() {
                return Err(envelope);
            }
            queue.push_back(envelope);
            queue.len()
        };
        self.publish_depth(depth);
        self.dispatcher.schedule(self);
        Ok(())
    }

    /// Remove the oldest envelope, in strict insertion order.
    pub fn dequeue(&self) -> Option<Envelope> {
        let (envelope, depth) = {
            let mut queue = self.queue.lock();
            let envelope = queue.pop_front();
            (envelope, queue.len())
        };
        if envelope.is_some() {
            self.publish_depth(depth);
        }
        envelope
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Drop the backlog and stop accepting envelopes. One-way.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
        self.queue.lock().clear();
        self.publish_depth(0);
    }

    fn publish_depth(&self, depth: usize) {
        self.metrics.gauge(
            names::MAILBOX_SIZE,
            depth as f64,
            Some(&[("actorId", self.actor_id.as_str())]),
        );
    }
}
