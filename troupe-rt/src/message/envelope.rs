// Layer 1: Standard library imports
use std::collections::HashMap;
use std::fmt;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

// Layer 3: Internal module imports
use super::payload::Payload;
use crate::actor::ActorRef;

/// Immutable message envelope.
///
/// Carries a [`Payload`] plus routing metadata: a correlation id generated
/// once at construction, the creation timestamp, a free-form metadata map,
/// and optional sender and reply-to references.
///
/// The correlation id is constant for the lifetime of the envelope; deriving
/// an envelope with a different sender via [`Envelope::with_sender`] keeps
/// the original correlation id, timestamp, metadata, and payload. This is how
/// the runtime threads senders through without mutating messages.
///
/// # Example
/// ```rust
/// use troupe_rt::message::{Envelope, Payload};
///
/// let envelope = Envelope::new(Payload::new("job"));
/// let first = envelope.correlation_id();
/// assert_eq!(envelope.correlation_id(), first);
/// ```
#[derive(Clone)]
pub struct Envelope {
    payload: Payload,
    correlation_id: Uuid,
    timestamp: DateTime<Utc>,
    metadata: HashMap<String, Value>,
    reply_to: Option<ActorRef>,
    sender: Option<ActorRef>,
}

impl Envelope {
    /// Create an envelope, filling in a fresh correlation id and timestamp.
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            correlation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
            reply_to: None,
            sender: None,
        }
    }

    /// Wrap an arbitrary message value.
    ///
    /// A value that already is an [`Envelope`] passes through unchanged,
    /// keeping its correlation id, metadata, reply-to, and timestamp;
    /// anything else is wrapped into a fresh envelope.
    pub fn from_message<M: Send + Sync + 'static>(message: M) -> Self {
        let payload = Payload::new(message);
        match payload.downcast_arc::<Envelope>() {
            Ok(envelope) => (*envelope).clone(),
            Err(payload) => Self::new(payload),
        }
    }

    /// Builder method: replace the sender, keeping everything else.
    pub fn with_sender(mut self, sender: ActorRef) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Builder method: replace the sender with an optional reference.
    pub fn with_sender_opt(mut self, sender: Option<ActorRef>) -> Self {
        self.sender = sender;
        self
    }

    /// Builder method: set the reply-to reference.
    pub fn with_reply_to(mut self, reply_to: ActorRef) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// Builder method: override the correlation id.
    ///
    /// Used when re-wrapping a payload that logically continues an existing
    /// exchange (router forwarding, ask attempts).
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Builder method: attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Move the payload out of the envelope.
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    pub fn reply_to(&self) -> Option<&ActorRef> {
        self.reply_to.as_ref()
    }

    pub fn sender(&self) -> Option<&ActorRef> {
        self.sender.as_ref()
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("payload", &self.payload)
            .field("correlation_id", &self.correlation_id)
            .field("timestamp", &self.timestamp)
            .field("sender", &self.sender.as_ref().map(|s| s.id().clone()))
            .finish_non_exhaustive()
    }
}
