//! Supervision: failure decisions and the supervisor actor.

pub mod strategy;
pub mod supervisor;

pub use strategy::{
    AllForOneStrategy, Decider, OneForOneStrategy, SupervisionDecision, SupervisionStrategy,
};
pub use supervisor::Supervisor;

pub(crate) use supervisor::{SupervisorBehavior, SupervisorCell};
