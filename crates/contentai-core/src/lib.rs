//! # contentai-core
//!
//! Client-side core for the content assistant.
//!
//! This crate is framework-agnostic and can be driven by:
//! - the `contentai` terminal client
//! - a desktop or web shell that renders [`session::ChatState`]
//!
//! ## Key Concepts
//!
//! - **Session**: a persisted conversation thread identified by an opaque id
//! - **StreamEvent**: one decoded NDJSON object from the chat endpoint
//! - **ChatController**: owns the message list and drives the streaming request
//! - **ChatEvent**: notifications broadcast to whatever is rendering the state

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod event_bus;
pub mod history;
pub mod logging;
pub mod managers;
pub mod paths;
pub mod session;
pub mod stream;

// Re-export commonly used types
pub use api::{ApiClient, ApiError, ChatBackend};
pub use auth::{CredentialStore, Credentials};
pub use config::ClientConfig;
pub use context::{ClientContext, ClientContextBuilder};
pub use error::ClientError;
pub use event_bus::{ChatEvent, EventBus};
pub use managers::{ChatController, ControllerOptions, SendHandle, StreamOutcome};
pub use session::{Attachment, ChatState, Location, Message, Role, SessionId, SessionSummary};
pub use stream::{StreamDecoder, StreamEvent};
