//! Core managers for chat state.
//!
//! Managers own state and spawn background work without any
//! framework-specific dependencies. They can be driven by:
//! - the `contentai` terminal client
//! - any GUI shell subscribed to the [`crate::EventBus`]

pub mod chat_controller;

pub use chat_controller::{ChatController, ControllerOptions, SendHandle, StreamOutcome};
