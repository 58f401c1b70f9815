//! Actor behavior trait, references, and the per-actor context.

pub mod actor_ref;
pub mod context;
pub mod traits;

pub use actor_ref::{ActorRef, Terminated};
pub use context::ActorContext;
pub use traits::{Actor, ActorFactory};
