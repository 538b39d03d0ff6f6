//! Request and response bodies of the content-assistant API.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::auth::UserProfile;
use crate::session::{Attachment, Role, SessionSummary};

/// Default user id the server assumes when none is sent.
pub const DEFAULT_USER_ID: &str = "user_default";

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    pub user_id: String,
    pub attachments: Vec<AttachmentMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_voice_id: Option<String>,
}

/// Attachment metadata sent with a chat request (no content, no url).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl From<&Attachment> for AttachmentMeta {
    fn from(attachment: &Attachment) -> Self {
        Self {
            name: attachment.name.clone(),
            mime_type: attachment.mime_type.clone(),
        }
    }
}

/// Response of `GET /sessions/{user_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionsResponse {
    #[serde(default)]
    pub sessions: Vec<SessionSummary>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `GET /history/{session_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<StoredMessage>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A message as persisted server-side: flat fields only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredMessage {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub meta: Option<StoredMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StoredMeta {
    #[serde(rename = "hasSearched", default)]
    pub has_searched: Option<bool>,
}

/// Response of `DELETE /sessions/{session_id}`.
///
/// The server answers 200 even on failure and reports it in `status`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Response of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// A stored persona the assistant can write in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandVoice {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub system_prompt: String,
}

/// Response of `GET /brand-voices/{user_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BrandVoicesResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub voices: Vec<BrandVoice>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Database ids come back as integers; client-side ones are strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_request_wire_shape() {
        let request = ChatRequest {
            message: "Outline a post".into(),
            session_id: "s1".into(),
            user_id: "writer@example.com".into(),
            attachments: vec![AttachmentMeta::from(&Attachment::new("a.png", "image/png"))],
            brand_voice_id: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "message": "Outline a post",
                "session_id": "s1",
                "user_id": "writer@example.com",
                "attachments": [{"name": "a.png", "type": "image/png"}]
            })
        );
    }

    #[test]
    fn chat_request_includes_voice_when_set() {
        let request = ChatRequest {
            message: "hi".into(),
            session_id: "s1".into(),
            user_id: DEFAULT_USER_ID.into(),
            attachments: vec![],
            brand_voice_id: Some("v1".into()),
        };
        assert_eq!(serde_json::to_value(&request).unwrap()["brand_voice_id"], "v1");
    }

    #[test]
    fn stored_message_accepts_numeric_ids_and_meta() {
        let response: HistoryResponse = serde_json::from_value(json!({
            "history": [
                {"id": 1, "role": "user", "content": "hi", "isLoading": false},
                {"id": "2", "role": "assistant", "content": "hello", "meta": {"hasSearched": true}}
            ]
        }))
        .unwrap();

        assert_eq!(response.history[0].id, "1");
        assert!(response.history[0].meta.is_none());
        assert_eq!(response.history[1].id, "2");
        assert_eq!(
            response.history[1].meta,
            Some(StoredMeta {
                has_searched: Some(true)
            })
        );
    }

    #[test]
    fn sessions_response_tolerates_error_payload() {
        let response: SessionsResponse =
            serde_json::from_value(json!({"sessions": [], "error": "db down"})).unwrap();
        assert!(response.sessions.is_empty());
        assert_eq!(response.error.as_deref(), Some("db down"));
    }

    #[test]
    fn status_response_detects_error() {
        let ok: StatusResponse = serde_json::from_value(json!({"status": "success"})).unwrap();
        let err: StatusResponse =
            serde_json::from_value(json!({"status": "error", "message": "nope"})).unwrap();
        assert!(!ok.is_error());
        assert!(err.is_error());
    }

    #[test]
    fn token_response_with_user() {
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "abc",
            "token_type": "bearer",
            "user": {"id": "1", "email": "a@b.c", "name": "A"}
        }))
        .unwrap();
        assert_eq!(token.user.unwrap().email, "a@b.c");
    }
}
