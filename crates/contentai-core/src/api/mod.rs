//! HTTP transport for the content-assistant API.
//!
//! [`ApiClient`] is a thin layer over a `ureq` agent that:
//! - builds endpoint URLs from [`ClientConfig`]
//! - attaches the bearer token from the injected [`CredentialStore`]
//! - turns non-2xx answers into [`ApiError`]
//! - forces a logout when the server answers 401

mod backend;
pub mod types;

pub use backend::{ChatBackend, ChatStream};
pub use types::{BrandVoice, ChatRequest, StoredMessage};

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::auth::{normalize_email, CredentialStore, Credentials};
use crate::config::ClientConfig;
use crate::event_bus::{ChatEvent, EventBus};
use crate::session::{SessionId, SessionSummary};

use types::{
    BrandVoicesResponse, HistoryResponse, LoginRequest, RegisterRequest, SessionsResponse,
    StatusResponse, TokenResponse,
};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: token missing, expired or invalid")]
    Unauthorized,

    #[error("API error {code}: {detail}")]
    Status { code: u16, detail: String },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] std::io::Error),

    #[error("Failed to store credentials: {0}")]
    Credentials(#[from] crate::auth::CredentialError),
}

/// Blocking HTTP client for the API.
pub struct ApiClient {
    agent: ureq::Agent,
    config: ClientConfig,
    credentials: Arc<CredentialStore>,
    event_bus: Option<Arc<EventBus>>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, credentials: Arc<CredentialStore>) -> Self {
        let mut builder = ureq::AgentBuilder::new()
            .user_agent(concat!("contentai/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.timeout_connect(timeout);
        }
        Self {
            agent: builder.build(),
            config,
            credentials,
            event_bus: None,
        }
    }

    /// Publish [`ChatEvent::LoggedOut`] on this bus when a 401 forces a logout.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = self.config.endpoint(path);
        log::debug!("{} {}", method, url);
        let request = self.agent.request(method, &url);
        match self.credentials.bearer_token() {
            Some(token) => request.set("Authorization", &format!("Bearer {token}")),
            None => request,
        }
    }

    /// Map transport results onto [`ApiError`], handling 401 globally.
    fn check(&self, result: Result<ureq::Response, ureq::Error>) -> Result<ureq::Response, ApiError> {
        match result {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(401, _)) => {
                self.force_logout();
                Err(ApiError::Unauthorized)
            }
            Err(ureq::Error::Status(code, response)) => {
                let status_text = response.status_text().to_string();
                let detail = response
                    .into_json::<Value>()
                    .ok()
                    .and_then(|body| body.get("detail").and_then(|d| d.as_str()).map(String::from))
                    .unwrap_or(status_text);
                Err(ApiError::Status { code, detail })
            }
            Err(ureq::Error::Transport(transport)) => Err(ApiError::Transport(transport.to_string())),
        }
    }

    fn force_logout(&self) {
        log::warn!("API answered 401; clearing credentials");
        if let Err(e) = self.credentials.clear() {
            log::error!("Failed to clear credentials: {}", e);
        }
        if let Some(bus) = &self.event_bus {
            bus.emit(ChatEvent::LoggedOut);
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.check(self.request("GET", path).set("Accept", "application/json").call())?;
        Ok(response.into_json()?)
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let response = self.check(
            self.request("POST", path)
                .set("Accept", "application/json")
                .send_json(body),
        )?;
        Ok(response.into_json()?)
    }

    /// Sign in and store the issued credentials.
    pub fn login(&self, email: &str, password: &str) -> Result<Credentials, ApiError> {
        let request = LoginRequest {
            email: normalize_email(email),
            password: password.to_string(),
        };
        let token: TokenResponse = self.post_json("auth/login", &request)?;
        let credentials = Credentials {
            access_token: token.access_token,
            token_type: token.token_type.unwrap_or_else(|| "bearer".to_string()),
            user: token.user,
        };
        self.credentials.set(credentials.clone())?;
        log::info!("Signed in as {}", request.email);
        Ok(credentials)
    }

    pub fn register(&self, email: &str, password: &str, full_name: &str) -> Result<(), ApiError> {
        let request = RegisterRequest {
            email: normalize_email(email),
            password: password.to_string(),
            full_name: full_name.to_string(),
        };
        let _: Value = self.post_json("auth/register", &request)?;
        Ok(())
    }

    /// Explicit sign-out. Purely client-side.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.credentials.clear()?;
        if let Some(bus) = &self.event_bus {
            bus.emit(ChatEvent::LoggedOut);
        }
        Ok(())
    }

    pub fn list_brand_voices(&self, user_id: &str) -> Result<Vec<BrandVoice>, ApiError> {
        let response: BrandVoicesResponse = self.get_json(&format!("brand-voices/{user_id}"))?;
        if !response.success {
            return Err(ApiError::Rejected(
                response.error.unwrap_or_else(|| "brand voices unavailable".to_string()),
            ));
        }
        Ok(response.voices)
    }
}

impl ChatBackend for ApiClient {
    fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>, ApiError> {
        let response: SessionsResponse = self.get_json(&format!("sessions/{user_id}"))?;
        if let Some(error) = response.error {
            log::warn!("Session list for {} reported an error: {}", user_id, error);
        }
        Ok(response.sessions)
    }

    fn fetch_history(&self, session_id: &SessionId) -> Result<Vec<StoredMessage>, ApiError> {
        let response: HistoryResponse = self.get_json(&format!("history/{session_id}"))?;
        if let Some(error) = response.error {
            log::warn!("History for {} reported an error: {}", session_id, error);
        }
        Ok(response.history)
    }

    fn delete_session(&self, session_id: &SessionId) -> Result<(), ApiError> {
        let response = self.check(self.request("DELETE", &format!("sessions/{session_id}")).call())?;
        let status: StatusResponse = response.into_json().unwrap_or_default();
        if status.is_error() {
            return Err(ApiError::Rejected(
                status.message.unwrap_or_else(|| format!("could not delete {session_id}")),
            ));
        }
        Ok(())
    }

    fn open_chat_stream(&self, request: &ChatRequest) -> Result<ChatStream, ApiError> {
        let response = self.check(
            self.request("POST", "chat")
                .set("Accept", "application/x-ndjson")
                .send_json(request),
        )?;
        Ok(Box::new(response.into_reader()))
    }
}
