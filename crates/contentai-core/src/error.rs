use thiserror::Error;

use crate::api::ApiError;
use crate::auth::CredentialError;
use crate::config::ConfigError;

/// Umbrella error for operations that cross module boundaries.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential error: {0}")]
    Credentials(#[from] CredentialError),

    #[error("Failed to start stream worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("{0}")]
    Paths(String),
}
