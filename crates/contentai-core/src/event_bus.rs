//! Framework-agnostic change notifications.
//!
//! The controller publishes a [`ChatEvent`] whenever state a view depends on
//! changes. Views subscribe and re-read a snapshot; deltas are carried only
//! where a view can use them directly (streamed text).
//!
//! # Example
//!
//! ```rust
//! use contentai_core::event_bus::{ChatEvent, EventBus};
//! use std::sync::Arc;
//!
//! let event_bus = Arc::new(EventBus::new());
//! let mut rx = event_bus.subscribe();
//!
//! event_bus.emit(ChatEvent::SessionsChanged);
//! assert_eq!(rx.try_recv().unwrap(), ChatEvent::SessionsChanged);
//! ```

use tokio::sync::broadcast;

use crate::managers::StreamOutcome;
use crate::session::Location;

pub use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Default channel capacity for the event bus.
/// Slow subscribers beyond this many events lag and miss events.
const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// The navigable location changed.
    Navigated(Location),
    /// The message list changed in some way other than a content delta.
    MessagesChanged,
    /// Text was appended to a streaming assistant message.
    ContentDelta { message_id: String, delta: String },
    /// The session list was replaced.
    SessionsChanged,
    /// A stream settled; the message is no longer loading.
    StreamFinished {
        message_id: String,
        outcome: StreamOutcome,
    },
    /// The server reported an error inside the stream.
    StreamError { message_id: String, error: String },
    /// Credentials were cleared after a 401 or an explicit logout.
    LoggedOut,
}

/// Broadcasts [`ChatEvent`]s to any number of subscribers.
///
/// Uses a tokio broadcast channel; emitting never blocks.
pub struct EventBus {
    sender: broadcast::Sender<ChatEvent>,
}

impl EventBus {
    /// Create a new EventBus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it (0 if none).
    pub fn emit(&self, event: ChatEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to all future events. Past events are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
