// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::time::{sleep, timeout};

// Layer 3: Internal module imports
use super::config::AskConfig;
use super::error::AskError;
use super::reply::ReplySlot;
use crate::actor::ActorRef;
use crate::message::Envelope;
use crate::observe::{events, TraceEvent};

/// Execute an ask against `target`, retrying per the system's [`AskConfig`].
///
/// Runs up to `max_retries + 1` attempts. Each attempt sends the request
/// with a fresh single-use reply handle as sender and awaits the typed slot
/// under the per-attempt timeout.
pub(crate) async fn run_ask<T, M>(
    target: &ActorRef,
    message: M,
    timeout_override: Option<Duration>,
) -> Result<T, AskError>
where
    T: Clone + Send + Sync + 'static,
    M: Send + Sync + 'static,
{
    if target.is_reply_handle() {
        return Err(AskError::Unsupported { operation: "ask" });
    }
    let Some(shared) = target.system_shared() else {
        return Err(AskError::TargetNotAlive {
            id: target.id().clone(),
        });
    };
    if !target.is_alive() {
        return Err(AskError::TargetNotAlive {
            id: target.id().clone(),
        });
    }

    let config: AskConfig = shared.config.ask.clone();
    let per_attempt_timeout = timeout_override.unwrap_or(config.default_timeout);
    // The base envelope preserves correlation id, metadata, reply-to, and
    // timestamp when the request already is an envelope.
    let base = Envelope::from_message(message);

    let mut attempt: u32 = 1;
    loop {
        let (slot, receiver) = ReplySlot::new::<T>();
        let reply_ref = ActorRef::reply_handle(slot);
        let envelope = base.clone().with_sender(reply_ref.clone());

        shared.tracer.record(
            TraceEvent::new(
                envelope.correlation_id(),
                events::ASK_ATTEMPT,
                target.id().as_str(),
                envelope.payload().type_name(),
            )
            .with_attempt(attempt)
            .with_timeout(per_attempt_timeout),
        );

        let correlation_id = envelope.correlation_id();
        let payload_type = envelope.payload().type_name();
        target.tell_envelope(envelope);

        let error = match timeout(per_attempt_timeout, receiver).await {
            Ok(Ok(Ok(payload))) => match payload.downcast_arc::<T>() {
                Ok(value) => {
                    return Ok(Arc::try_unwrap(value).unwrap_or_else(|value| (*value).clone()))
                }
                Err(payload) => AskError::ResponseTypeMismatch {
                    expected: std::any::type_name::<T>().to_owned(),
                    actual: payload.type_name().to_owned(),
                },
            },
            Ok(Ok(Err(error))) => error,
            Ok(Err(_closed)) => AskError::Cancelled,
            Err(_elapsed) => {
                // Stop the reply handle so a late reply cannot resolve it.
                reply_ref.stop_reply_handle();
                AskError::Timeout {
                    target: target.id().clone(),
                    timeout: per_attempt_timeout,
                    attempt,
                }
            }
        };

        let kind_retryable = config.retryable_kinds.contains(&error.kind());
        let can_retry = config.enable_retries && attempt <= config.max_retries && kind_retryable;
        if !can_retry {
            let event_name = if !kind_retryable {
                events::ASK_FAILED_NON_RETRYABLE
            } else {
                events::ASK_FAILED_FINAL
            };
            shared.tracer.record(
                TraceEvent::new(correlation_id, event_name, target.id().as_str(), payload_type)
                    .with_attempt(attempt)
                    .with_timeout(per_attempt_timeout),
            );
            return Err(error);
        }

        shared.tracer.record(
            TraceEvent::new(
                correlation_id,
                events::ASK_RETRY,
                target.id().as_str(),
                payload_type,
            )
            .with_attempt(attempt)
            .with_timeout(per_attempt_timeout),
        );
        sleep(config.calculate_backoff(attempt as i32)).await;
        attempt += 1;
    }
}
