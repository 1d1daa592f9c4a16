use crate::config::ConfigError;
use crate::http_client::HttpError;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token pair returned by `/oidc/token` and `/oidc/refresh-token`.
///
/// The access token itself travels in an HTTP-only cookie and is never part
/// of this body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub refresh_token: String,
    pub expires_in: u64,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("No code provided")]
    MissingCode,

    #[error("State mismatch")]
    StateMismatch,

    #[error("No refresh token found")]
    MissingRefreshToken,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl AuthError {
    /// Failures after which the caller should send the user back to login
    pub fn requires_login(&self) -> bool {
        match self {
            AuthError::Config(_) => false,
            AuthError::Storage(e) => e.is_not_found(),
            AuthError::Http(HttpError::Status { status, .. }) => (400..500).contains(status),
            AuthError::Http(_) => false,
            AuthError::MissingCode | AuthError::StateMismatch | AuthError::MissingRefreshToken => {
                true
            }
            AuthError::InvalidUrl(_) => false,
        }
    }
}
