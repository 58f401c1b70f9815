//! Type-routed event bus internal to the actor system.
//!
//! Events are routed by exact payload type: `publish::<T>` reaches the
//! actors currently subscribed to `T` and nothing else (no supertype
//! traversal). The system removes an actor from every index as part of
//! stopping it, before its mailbox is disposed.

// Layer 1: Standard library imports
use std::any::TypeId;
use std::collections::{HashMap, HashSet};

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::actor::ActorRef;
use crate::message::{Envelope, Payload};
use crate::util::ActorId;

/// Monitoring events emitted by the bus, exposed for diagnostics.
#[derive(Debug, Clone)]
pub enum BusEvent {
    Subscribed {
        actor: ActorId,
        event_type: &'static str,
        timestamp: DateTime<Utc>,
    },
    Unsubscribed {
        actor: ActorId,
        event_type: &'static str,
        timestamp: DateTime<Utc>,
    },
    Published {
        event_type: &'static str,
        delivered: usize,
        timestamp: DateTime<Utc>,
    },
    Cleanup {
        actor: ActorId,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Default)]
struct BusState {
    by_type: HashMap<TypeId, HashMap<ActorId, ActorRef>>,
    by_actor: HashMap<ActorId, HashSet<TypeId>>,
    type_names: HashMap<TypeId, &'static str>,
    events: Vec<BusEvent>,
    disposed: bool,
}

/// Type-to-subscriber map with publish/subscribe/cleanup.
///
/// The two indexes are kept consistent: a subscriber appears on both sides
/// for exactly the types it subscribed to, and empty buckets collapse.
#[derive(Default)]
pub struct EventBus {
    state: Mutex<BusState>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe an actor to events of type `E`. Idempotent: only the first
    /// subscription emits a monitoring event.
    pub fn subscribe<E: Send + Sync + 'static>(&self, subscriber: &ActorRef) {
        let type_id = TypeId::of::<E>();
        let type_name = std::any::type_name::<E>();
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        let inserted = state
            .by_type
            .entry(type_id)
            .or_default()
            .insert(subscriber.id().clone(), subscriber.clone())
            .is_none();
        if !inserted {
            return;
        }
        state.type_names.insert(type_id, type_name);
        state
            .by_actor
            .entry(subscriber.id().clone())
            .or_default()
            .insert(type_id);
        state.events.push(BusEvent::Subscribed {
            actor: subscriber.id().clone(),
            event_type: type_name,
            timestamp: Utc::now(),
        });
    }

    /// Remove an actor's subscription to `E`. Emits a monitoring event only
    /// if something was actually removed.
    pub fn unsubscribe<E: Send + Sync + 'static>(&self, subscriber: &ActorRef) {
        let type_id = TypeId::of::<E>();
        let mut state = self.state.lock();
        let removed = match state.by_type.get_mut(&type_id) {
            Some(bucket) => bucket.remove(subscriber.id()).is_some(),
            None => false,
        };
        if !removed {
            return;
        }
        if state.by_type.get(&type_id).is_some_and(|bucket| bucket.is_empty()) {
            state.by_type.remove(&type_id);
        }
        if let Some(types) = state.by_actor.get_mut(subscriber.id()) {
            types.remove(&type_id);
            if types.is_empty() {
                state.by_actor.remove(subscriber.id());
            }
        }
        let type_name = state
            .type_names
            .get(&type_id)
            .copied()
            .unwrap_or_else(|| std::any::type_name::<E>());
        state.events.push(BusEvent::Unsubscribed {
            actor: subscriber.id().clone(),
            event_type: type_name,
            timestamp: Utc::now(),
        });
    }

    /// Deliver `event` to every subscriber of exactly type `E`.
    ///
    /// Each subscriber receives a fresh envelope sharing one payload
    /// allocation. Returns the delivery count.
    pub fn publish<E: Send + Sync + 'static>(&self, event: E) -> usize {
        let subscribers: Vec<ActorRef> = {
            let state = self.state.lock();
            if state.disposed {
                return 0;
            }
            state
                .by_type
                .get(&TypeId::of::<E>())
                .map(|bucket| bucket.values().cloned().collect())
                .unwrap_or_default()
        };
        let payload = Payload::new(event);
        for subscriber in &subscribers {
            subscriber.tell_envelope(Envelope::new(payload.clone()));
        }
        let delivered = subscribers.len();
        self.state.lock().events.push(BusEvent::Published {
            event_type: std::any::type_name::<E>(),
            delivered,
            timestamp: Utc::now(),
        });
        delivered
    }

    /// Remove `actor` from every index. Called by the system while stopping
    /// an actor, before mailbox disposal.
    pub fn cleanup(&self, actor: &ActorId) {
        let mut state = self.state.lock();
        let Some(types) = state.by_actor.remove(actor) else {
            return;
        };
        for type_id in types {
            if let Some(bucket) = state.by_type.get_mut(&type_id) {
                bucket.remove(actor);
                if bucket.is_empty() {
                    state.by_type.remove(&type_id);
                }
            }
        }
        state.events.push(BusEvent::Cleanup {
            actor: actor.clone(),
            timestamp: Utc::now(),
        });
    }

    /// Number of distinct subscribed actors.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().by_actor.len()
    }

    /// Total number of (actor, type) subscription pairs.
    pub fn subscription_count(&self) -> usize {
        self.state
            .lock()
            .by_actor
            .values()
            .map(HashSet::len)
            .sum()
    }

    /// Snapshot of the monitoring event sequence.
    pub fn events(&self) -> Vec<BusEvent> {
        self.state.lock().events.clone()
    }

    /// Clear all indexes and refuse further subscriptions and publishes.
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        state.disposed = true;
        state.by_type.clear();
        state.by_actor.clear();
        state.type_names.clear();
    }
}
