//! Request/response ("ask") protocol.
//!
//! An ask allocates a single-use reply handle, tells the target an envelope
//! whose sender is that handle, and awaits the typed completion slot with a
//! per-attempt timeout. Timeouts are retried with exponential backoff
//! according to [`AskConfig`]; every other error propagates immediately.

pub mod config;
pub mod error;
pub mod reply;

mod protocol;

pub use config::AskConfig;
pub use error::{AskError, AskErrorKind};

pub(crate) use protocol::run_ask;
pub(crate) use reply::ReplySlot;
