//! Convenience re-exports for the common case.
//!
//! ```rust
//! use troupe_rt::prelude::*;
//! ```

pub use crate::actor::{Actor, ActorContext, ActorRef, Terminated};
pub use crate::ask::{AskConfig, AskError};
pub use crate::message::{Envelope, Payload};
pub use crate::router::{RouterConfig, RoutingStrategy};
pub use crate::supervision::{
    AllForOneStrategy, OneForOneStrategy, SupervisionDecision, SupervisionStrategy, Supervisor,
};
pub use crate::system::{ActorSystem, SystemConfig, SystemError};
pub use crate::util::ActorId;
