// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::util::ActorId;

/// Errors produced by the ask protocol and by unsupported operations on
/// reply handles.
#[derive(Debug, Error)]
pub enum AskError {
    /// The target reference is not alive (or its system is gone).
    #[error("ask target '{id}' is not alive")]
    TargetNotAlive { id: ActorId },

    /// An attempt exceeded its per-attempt timeout. Retryable by default.
    #[error("ask to '{target}' timed out after {timeout:?} (attempt {attempt})")]
    Timeout {
        target: ActorId,
        timeout: Duration,
        attempt: u32,
    },

    /// The reply payload was not of the expected type.
    #[error(
        "ask reply type mismatch: expected '{expected}', received '{actual}'; \
         reply payloads must be the response value itself"
    )]
    ResponseTypeMismatch { expected: String, actual: String },

    /// The reply payload was a nested envelope instead of a response value.
    #[error("ask reply was an envelope, not a response value")]
    ResponseEnvelopeShape,

    /// The reply handle was stopped before a reply arrived.
    #[error("ask was cancelled before completion")]
    Cancelled,

    /// Operation not supported on a reply handle.
    #[error("'{operation}' is not supported on an ask reply handle")]
    Unsupported { operation: &'static str },
}

/// Error kinds, used to express the retryable set in [`crate::ask::AskConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AskErrorKind {
    TargetNotAlive,
    Timeout,
    ResponseTypeMismatch,
    ResponseEnvelopeShape,
    Cancelled,
    Unsupported,
}

impl AskError {
    pub fn kind(&self) -> AskErrorKind {
        match self {
            Self::TargetNotAlive { .. } => AskErrorKind::TargetNotAlive,
            Self::Timeout { .. } => AskErrorKind::Timeout,
            Self::ResponseTypeMismatch { .. } => AskErrorKind::ResponseTypeMismatch,
            Self::ResponseEnvelopeShape => AskErrorKind::ResponseEnvelopeShape,
            Self::Cancelled => AskErrorKind::Cancelled,
            Self::Unsupported { .. } => AskErrorKind::Unsupported,
        }
    }
}
