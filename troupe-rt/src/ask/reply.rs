// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use tokio::sync::oneshot;

// Layer 3: Internal module imports
use super::error::AskError;
use crate::message::{Envelope, Payload};

/// Typed single-use completion slot behind an ask reply handle.
///
/// The expected response type is erased into a monomorphized check function
/// so the enclosing reference stays non-generic. The slot resolves at most
/// once: with the reply payload when its type matches, with a typed error
/// on mismatch, or with a cancellation error when the handle is stopped
/// first.
pub struct ReplySlot {
    expected: &'static str,
    matches: fn(&Payload) -> bool,
    sender: Mutex<Option<oneshot::Sender<Result<Payload, AskError>>>>,
}

fn payload_is<T: Send + Sync + 'static>(payload: &Payload) -> bool {
    payload.is::<T>()
}

impl ReplySlot {
    /// Allocate a slot expecting a reply of type `T`.
    pub fn new<T: Send + Sync + 'static>(
    ) -> (Self, oneshot::Receiver<Result<Payload, AskError>>) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                expected: std::any::type_name::<T>(),
                matches: payload_is::<T>,
                sender: Mutex::new(Some(sender)),
            },
            receiver,
        )
    }

    /// Resolve the slot from a reply envelope.
    ///
    /// The reply payload must be the response value itself; a nested
    /// envelope or any other type resolves the slot with an error instead.
    pub fn complete_with_envelope(&self, envelope: Envelope) {
        let Some(sender) = self.sender.lock().take() else {
            return;
        };
        let payload = envelope.into_payload();
        let result = if (self.matches)(&payload) {
            Ok(payload)
        } else if payload.is::<Envelope>() {
            Err(AskError::ResponseEnvelopeShape)
        } else {
            Err(AskError::ResponseTypeMismatch {
                expected: self.expected.to_owned(),
                actual: payload.type_name().to_owned(),
            })
        };
        let _ = sender.send(result);
    }

    /// Resolve the slot with a cancellation error, if still pending.
    pub fn cancel(&self) {
        if let Some(sender) = self.sender.lock().take() {
            let _ = sender.send(Err(AskError::Cancelled));
        }
    }

    pub fn is_completed(&self) -> bool {
        self.sender.lock().is_none()
    }

    pub fn expected_type(&self) -> &'static str {
        self.expected
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_matching_reply_resolves_with_payload() {
        let (slot, receiver) = ReplySlot::new::<u64>();
        slot.complete_with_envelope(Envelope::new(Payload::new(42u64)));

        let payload = receiver.await.unwrap().unwrap();
        assert_eq!(payload.downcast_ref::<u64>(), Some(&42));
        assert!(slot.is_completed());
    }

    #[tokio::test]
    async fn test_mismatched_reply_resolves_with_typed_error() {
        let (slot, receiver) = ReplySlot::new::<u64>();
        slot.complete_with_envelope(Envelope::new(Payload::new("wrong".to_owned())));

        let error = receiver.await.unwrap().unwrap_err();
        match error {
            AskError::ResponseTypeMismatch { expected, actual } => {
                assert_eq!(expected, "u64");
                assert!(actual.contains("String"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_nested_envelope_is_a_shape_error() {
        let (slot, receiver) = ReplySlot::new::<u64>();
        let nested = Envelope::new(Payload::new(1u64));
        slot.complete_with_envelope(Envelope::new(Payload::new(nested)));

        let error = receiver.await.unwrap().unwrap_err();
        assert!(matches!(error, AskError::ResponseEnvelopeShape));
    }

    #[tokio::test]
    async fn test_cancel_resolves_pending_slot() {
        let (slot, receiver) = ReplySlot::new::<u64>();
        slot.cancel();

        let error = receiver.await.unwrap().unwrap_err();
        assert!(matches!(error, AskError::Cancelled));
    }

    #[tokio::test]
    async fn test_slot_resolves_at_most_once() {
        let (slot, receiver) = ReplySlot::new::<u64>();
        slot.complete_with_envelope(Envelope::new(Payload::new(1u64)));
        // Late completions and cancellations are ignored.
        slot.complete_with_envelope(Envelope::new(Payload::new(2u64)));
        slot.cancel();

        let payload = receiver.await.unwrap().unwrap();
        assert_eq!(payload.downcast_ref::<u64>(), Some(&1));
    }
}
