//! Bounded dead-letter queue for undeliverable envelopes.

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::actor::ActorRef;
use crate::message::Envelope;
use crate::observe::{names, MetricsSink};
use crate::util::ActorId;

/// An undeliverable envelope together with its original sender and the
/// recipient it was intended for.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub envelope: Envelope,
    pub sender: Option<ActorRef>,
    pub recipient: ActorId,
    pub timestamp: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(envelope: Envelope, recipient: ActorId) -> Self {
        let sender = envelope.sender().cloned();
        Self {
            envelope,
            sender,
            recipient,
            timestamp: Utc::now(),
        }
    }
}

struct DeadLetterState {
    entries: VecDeque<DeadLetter>,
    disposed: bool,
}

/// Bounded FIFO of dead letters.
///
/// Overflow evicts the oldest entry; every eviction increments
/// `dead_letters.evicted` by exactly one and every accepted entry increments
/// `dead_letters`. The queue length never exceeds the configured capacity.
pub struct DeadLetterQueue {
    capacity: usize,
    state: Mutex<DeadLetterState>,
    metrics: Arc<dyn MetricsSink>,
}

impl DeadLetterQueue {
    pub fn new(capacity: usize, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            capacity,
            state: Mutex::new(DeadLetterState {
                entries: VecDeque::new(),
                disposed: false,
            }),
            metrics,
        }
    }

    /// Append a dead letter, evicting the oldest entry when full.
    ///
    /// No-op after disposal.
    pub fn push(&self, letter: DeadLetter) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        if state.entries.len() >= self.capacity {
            state.entries.pop_front();
            self.metrics.increment(names::DEAD_LETTERS_EVICTED, 1, None);
        }
        state.entries.push_back(letter);
        self.metrics.increment(names::DEAD_LETTERS, 1, None);
    }

    /// Remove and return the oldest entry.
    pub fn dequeue(&self) -> Option<DeadLetter> {
        self.state.lock().entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the queued entries, oldest first.
    pub fn entries(&self) -> Vec<DeadLetter> {
        self.state.lock().entries.iter().cloned().collect()
    }

    /// Clear the queue and refuse further entries.
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        state.disposed = true;
        state.entries.clear();
    }
}
