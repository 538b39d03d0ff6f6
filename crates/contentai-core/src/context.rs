//! ClientContext - the shared state a front end needs to talk to the API.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      ClientContext      │
//!                    ├─────────────────────────┤
//!                    │  - ClientConfig         │
//!                    │  - CredentialStore      │
//!                    │  - EventBus             │
//!                    │  - ApiClient            │
//!                    └───────────┬─────────────┘
//!                                │
//!                    ┌───────────┴───────────┐
//!                    ▼                       ▼
//!             ┌─────────────┐         ┌─────────────┐
//!             │  CLI / REPL │         │  GUI shell  │
//!             └─────────────┘         └─────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::{ApiClient, ChatBackend};
use crate::auth::CredentialStore;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::event_bus::EventBus;
use crate::managers::{ChatController, ControllerOptions};
use crate::paths;

/// Configuration for building a ClientContext.
#[derive(Default)]
pub struct ClientContextBuilder {
    config_dir: Option<PathBuf>,
    config: Option<ClientConfig>,
    base_url: Option<String>,
    credentials: Option<Arc<CredentialStore>>,
    event_bus: Option<Arc<EventBus>>,
}

impl ClientContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding `config.json` and `credentials.json`.
    pub fn config_dir(mut self, dir: PathBuf) -> Self {
        self.config_dir = Some(dir);
        self
    }

    /// Use this config instead of loading one from disk.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the API base URL (highest precedence).
    pub fn base_url(mut self, url: Option<String>) -> Self {
        self.base_url = url;
        self
    }

    /// Use an existing CredentialStore (for testing or custom configurations).
    pub fn credentials(mut self, store: Arc<CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Use an existing EventBus (for testing or custom configurations).
    pub fn event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Build the ClientContext.
    ///
    /// Config precedence: explicit base URL, then `$CONTENTAI_API_URL`,
    /// then `config.json`, then defaults.
    pub fn build(self) -> Result<ClientContext, ClientError> {
        let config_dir = match self.config_dir {
            Some(dir) => dir,
            None => paths::config_dir().map_err(ClientError::Paths)?,
        };

        let config = match self.config {
            Some(config) => config,
            None => ClientConfig::load(&config_dir)?,
        }
        .with_env_overrides()
        .with_base_url(self.base_url);

        let credentials = match self.credentials {
            Some(store) => store,
            None => Arc::new(CredentialStore::persistent(&config_dir)?),
        };
        let event_bus = self.event_bus.unwrap_or_else(|| Arc::new(EventBus::new()));

        let api = Arc::new(
            ApiClient::new(config.clone(), Arc::clone(&credentials))
                .with_event_bus(Arc::clone(&event_bus)),
        );

        log::debug!(
            "Client context ready (config_dir={}, base_url={})",
            config_dir.display(),
            config.base_url
        );

        Ok(ClientContext {
            config_dir,
            config,
            credentials,
            event_bus,
            api,
        })
    }
}

/// Shared state for one client process.
///
/// Cloning the context just clones the pointers.
#[derive(Clone)]
pub struct ClientContext {
    config_dir: PathBuf,
    pub config: ClientConfig,
    pub credentials: Arc<CredentialStore>,
    pub event_bus: Arc<EventBus>,
    pub api: Arc<ApiClient>,
}

impl ClientContext {
    pub fn builder() -> ClientContextBuilder {
        ClientContextBuilder::new()
    }

    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    /// A chat controller wired to this context's API, credentials and bus.
    pub fn chat_controller(&self) -> ChatController {
        ChatController::new(
            Arc::clone(&self.api) as Arc<dyn ChatBackend>,
            Arc::clone(&self.credentials),
            Arc::clone(&self.event_bus),
            ControllerOptions::from_config(&self.config),
        )
    }

    /// User id for list endpoints: the signed-in email, else the configured id.
    pub fn user_id(&self) -> Option<String> {
        self.credentials
            .user_email()
            .or_else(|| self.config.user_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::config::DEFAULT_BASE_URL;
    use crate::paths::test_support::with_env;
    use tempfile::tempdir;

    #[test]
    fn builds_with_defaults_from_empty_dir() {
        let dir = tempdir().unwrap();
        let ctx = with_env(&[("CONTENTAI_API_URL", None)], || {
            ClientContext::builder()
                .config_dir(dir.path().to_path_buf())
                .build()
                .unwrap()
        });

        assert_eq!(ctx.config.base_url, DEFAULT_BASE_URL);
        assert_eq!(ctx.config_dir(), &dir.path().to_path_buf());
        assert!(!ctx.credentials.is_signed_in());
        assert!(ctx.user_id().is_none());
    }

    #[test]
    fn explicit_base_url_wins() {
        let dir = tempdir().unwrap();
        ClientConfig {
            base_url: "http://from-file/api".into(),
            ..ClientConfig::default()
        }
        .save(dir.path())
        .unwrap();

        let ctx = with_env(&[("CONTENTAI_API_URL", Some("http://from-env/api"))], || {
            ClientContext::builder()
                .config_dir(dir.path().to_path_buf())
                .base_url(Some("http://from-flag/api".into()))
                .build()
                .unwrap()
        });
        assert_eq!(ctx.config.base_url, "http://from-flag/api");
        assert_eq!(ctx.api.config().base_url, "http://from-flag/api");
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempdir().unwrap();
        ClientConfig {
            base_url: "http://from-file/api".into(),
            ..ClientConfig::default()
        }
        .save(dir.path())
        .unwrap();

        let ctx = with_env(&[("CONTENTAI_API_URL", Some("http://from-env/api"))], || {
            ClientContext::builder()
                .config_dir(dir.path().to_path_buf())
                .build()
                .unwrap()
        });
        assert_eq!(ctx.config.base_url, "http://from-env/api");
    }

    #[test]
    fn shares_injected_credentials_and_bus() {
        let dir = tempdir().unwrap();
        let store = Arc::new(CredentialStore::in_memory());
        store
            .set(Credentials {
                access_token: "t".into(),
                token_type: "bearer".into(),
                user: None,
            })
            .unwrap();
        let bus = Arc::new(EventBus::new());

        let ctx = ClientContext::builder()
            .config_dir(dir.path().to_path_buf())
            .config(ClientConfig {
                user_id: Some("configured".into()),
                ..ClientConfig::default()
            })
            .credentials(Arc::clone(&store))
            .event_bus(Arc::clone(&bus))
            .build()
            .unwrap();

        assert!(Arc::ptr_eq(&ctx.credentials, &store));
        assert!(Arc::ptr_eq(&ctx.event_bus, &bus));
        assert!(Arc::ptr_eq(ctx.api.credentials(), &store));
        assert_eq!(ctx.user_id().as_deref(), Some("configured"));
        assert!(ctx.chat_controller().messages().is_empty());
    }
}
