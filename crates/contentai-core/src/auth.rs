//! Credentials and their lifecycle.
//!
//! A [`CredentialStore`] is created once per process and injected into the
//! transport. It is set at login and cleared at logout or when the API
//! answers 401; nothing else writes to it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The signed-in user as reported by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A bearer token plus the profile it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Holds the current credentials, optionally mirrored to disk.
#[derive(Default)]
pub struct CredentialStore {
    current: RwLock<Option<Credentials>>,
    /// `credentials.json` location; `None` keeps everything in memory.
    path: Option<PathBuf>,
}

impl CredentialStore {
    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A store backed by `{dir}/credentials.json`, pre-loaded if it exists.
    pub fn persistent(dir: &Path) -> Result<Self, CredentialError> {
        let path = dir.join(CREDENTIALS_FILE);
        let current = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            Some(serde_json::from_str::<Credentials>(&contents)?)
        } else {
            None
        };
        Ok(Self {
            current: RwLock::new(current),
            path: Some(path),
        })
    }

    /// Replace the current credentials (login).
    pub fn set(&self, credentials: Credentials) -> Result<(), CredentialError> {
        if let Some(path) = &self.path {
            write_atomic(path, &serde_json::to_string_pretty(&credentials)?)?;
        }
        *self.current.write().unwrap() = Some(credentials);
        Ok(())
    }

    /// Forget the current credentials (logout or 401).
    ///
    /// Memory is cleared even if removing the file fails.
    pub fn clear(&self) -> Result<(), CredentialError> {
        self.current.write().unwrap().take();
        if let Some(path) = &self.path {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    pub fn get(&self) -> Option<Credentials> {
        self.current.read().unwrap().clone()
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap()
            .as_ref()
            .map(|c| c.access_token.clone())
    }

    /// Email of the signed-in user; this doubles as the API's user id.
    pub fn user_email(&self) -> Option<String> {
        self.current
            .read()
            .unwrap()
            .as_ref()
            .and_then(|c| c.user.as_ref())
            .map(|u| u.email.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.read().unwrap().is_some()
    }
}

/// Lowercase and trim, the same normalization the server applies.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), std::io::Error> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Credentials {
        Credentials {
            access_token: "tok-123".into(),
            token_type: "bearer".into(),
            user: Some(UserProfile {
                id: "7".into(),
                email: "writer@example.com".into(),
                name: Some("Writer".into()),
            }),
        }
    }

    mod in_memory {
        use super::*;

        #[test]
        fn starts_signed_out() {
            let store = CredentialStore::in_memory();
            assert!(!store.is_signed_in());
            assert!(store.bearer_token().is_none());
            assert!(store.user_email().is_none());
        }

        #[test]
        fn set_then_clear() {
            let store = CredentialStore::in_memory();
            store.set(sample()).unwrap();
            assert_eq!(store.bearer_token().as_deref(), Some("tok-123"));
            assert_eq!(store.user_email().as_deref(), Some("writer@example.com"));

            store.clear().unwrap();
            assert!(store.get().is_none());
        }
    }

    mod persistent {
        use super::*;

        #[test]
        fn survives_reload() {
            let dir = tempdir().unwrap();
            CredentialStore::persistent(dir.path())
                .unwrap()
                .set(sample())
                .unwrap();

            let reloaded = CredentialStore::persistent(dir.path()).unwrap();
            assert_eq!(reloaded.get(), Some(sample()));
            assert!(!dir.path().join("credentials.json.tmp").exists());
        }

        #[test]
        fn clear_removes_file() {
            let dir = tempdir().unwrap();
            let store = CredentialStore::persistent(dir.path()).unwrap();
            store.set(sample()).unwrap();
            assert!(dir.path().join(CREDENTIALS_FILE).exists());

            store.clear().unwrap();
            assert!(!dir.path().join(CREDENTIALS_FILE).exists());
            assert!(!CredentialStore::persistent(dir.path()).unwrap().is_signed_in());
        }

        #[test]
        fn clear_without_file_is_ok() {
            let dir = tempdir().unwrap();
            let store = CredentialStore::persistent(dir.path()).unwrap();
            assert!(store.clear().is_ok());
        }
    }

    #[test]
    fn token_type_defaults_to_bearer() {
        let creds: Credentials = serde_json::from_str(r#"{"access_token":"x"}"#).unwrap();
        assert_eq!(creds.token_type, "bearer");
        assert!(creds.user.is_none());
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Writer@Example.COM "), "writer@example.com");
    }
}
