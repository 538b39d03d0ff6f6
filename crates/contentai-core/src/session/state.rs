//! Session ids, the session list and the active chat state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::Message;

/// Opaque identifier of a conversation thread.
///
/// Generated client-side for new chats, otherwise assigned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the sidebar session list.
///
/// The server returns these newest first; list position is the only
/// ordering information the client keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    #[serde(default)]
    pub title: Option<String>,
}

/// The navigable location: either a blank new chat or a specific session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Location {
    #[default]
    NewChat,
    Chat(SessionId),
}

impl Location {
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Location::NewChat => None,
            Location::Chat(id) => Some(id),
        }
    }

    /// Route-style rendering, `/` or `/chat/{id}`.
    pub fn path(&self) -> String {
        match self {
            Location::NewChat => "/".to_string(),
            Location::Chat(id) => format!("/chat/{id}"),
        }
    }
}

/// Everything the chat view renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    pub location: Location,
    pub messages: Vec<Message>,
    pub sessions: Vec<SessionSummary>,
    /// Set when the controller minted a session id itself; the next history
    /// load for that id is skipped so optimistic messages survive.
    pub just_created: Option<SessionId>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_session(&self) -> Option<&SessionId> {
        self.location.session_id()
    }

    /// The message a stream may write to: the last message, and only if its
    /// id is `message_id`.
    pub fn streaming_target(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.last_mut().filter(|m| m.id == message_id)
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    pub fn is_streaming(&self) -> bool {
        self.messages.iter().any(|m| m.is_loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    mod session_id {
        use super::*;

        #[test]
        fn new_generates_unique_ids() {
            assert_ne!(SessionId::new(), SessionId::new());
        }

        #[test]
        fn display_shows_inner_string() {
            let id = SessionId::from("chat-42");
            assert_eq!(id.to_string(), "chat-42");
            assert_eq!(id.as_str(), "chat-42");
        }

        #[test]
        fn serializes_as_plain_string() {
            let id = SessionId::from("abc");
            assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        }
    }

    mod session_summary {
        use super::*;

        #[test]
        fn deserializes_server_shape() {
            let summary: SessionSummary =
                serde_json::from_str(r#"{"session_id":"s1","title":"Blog post ideas"}"#)
                    .unwrap();
            assert_eq!(summary.session_id, SessionId::from("s1"));
            assert_eq!(summary.title.as_deref(), Some("Blog post ideas"));
        }

        #[test]
        fn title_may_be_missing_or_null() {
            let a: SessionSummary = serde_json::from_str(r#"{"session_id":"s1"}"#).unwrap();
            let b: SessionSummary =
                serde_json::from_str(r#"{"session_id":"s1","title":null}"#).unwrap();
            assert!(a.title.is_none());
            assert_eq!(a, b);
        }
    }

    mod location {
        use super::*;

        #[test]
        fn defaults_to_new_chat() {
            assert_eq!(Location::default(), Location::NewChat);
            assert!(Location::NewChat.session_id().is_none());
        }

        #[test]
        fn path_rendering() {
            assert_eq!(Location::NewChat.path(), "/");
            assert_eq!(Location::Chat(SessionId::from("x")).path(), "/chat/x");
        }
    }

    mod chat_state {
        use super::*;

        #[test]
        fn streaming_target_is_last_message_only() {
            let mut state = ChatState::new();
            let first = Message::assistant_placeholder();
            let first_id = first.id.clone();
            state.messages.push(first);
            state.messages.push(Message::user("next", Vec::new()));

            assert!(state.streaming_target(&first_id).is_none());
            assert!(state.message_mut(&first_id).is_some());
        }

        #[test]
        fn is_streaming_tracks_loading_messages() {
            let mut state = ChatState::new();
            state.messages.push(Message::user("hi", Vec::new()));
            assert!(!state.is_streaming());

            let placeholder = Message::assistant_placeholder();
            assert_eq!(placeholder.role, Role::Assistant);
            state.messages.push(placeholder);
            assert!(state.is_streaming());
        }
    }
}
