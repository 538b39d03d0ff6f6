use std::io::Read;

use super::types::{ChatRequest, StoredMessage};
use super::ApiError;
use crate::session::{SessionId, SessionSummary};

/// An open chat response body, read incrementally by the stream worker.
pub type ChatStream = Box<dyn Read + Send>;

/// The remote operations the chat controller depends on.
///
/// [`super::ApiClient`] is the HTTP implementation.
pub trait ChatBackend: Send + Sync {
    fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>, ApiError>;

    fn fetch_history(&self, session_id: &SessionId) -> Result<Vec<StoredMessage>, ApiError>;

    fn delete_session(&self, session_id: &SessionId) -> Result<(), ApiError>;

    /// Send a chat message and return the NDJSON response body.
    fn open_chat_stream(&self, request: &ChatRequest) -> Result<ChatStream, ApiError>;
}
