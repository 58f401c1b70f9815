// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::util::ActorId;

/// Errors from actor system lifecycle operations.
#[derive(Debug, Error)]
pub enum SystemError {
    /// Operation attempted on a shut-down system.
    #[error("actor system is shut down")]
    ShutDown,

    /// Spawn with an id that is already registered.
    #[error("actor id '{id}' is already registered")]
    IdCollision { id: ActorId },

    /// Operation on an id that is not in the registry.
    #[error("unknown actor '{id}'")]
    UnknownActor { id: ActorId },

    /// The actor's `pre_start` hook failed; the spawn was aborted.
    #[error("actor '{id}' failed to start")]
    PreStartFailed {
        id: ActorId,
        #[source]
        source: anyhow::Error,
    },
}
