//! Session identity and the in-memory chat state.
//!
//! The controller exclusively owns one [`ChatState`]; presentation layers
//! read snapshots of it and never mutate it directly.

mod message;
mod state;

pub use message::{Answer, Attachment, Message, Research, Role, Source};
pub use state::{ChatState, Location, SessionId, SessionSummary};
