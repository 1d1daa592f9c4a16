use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Errors from the confidential exchange with the identity provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("OIDC provider error: {error} - {error_description}")]
    OAuthError {
        error: String,
        error_description: String,
    },

    #[error("OIDC provider returned status {status}")]
    Status { status: u16 },

    #[error("Failed to parse token response: {0}")]
    InvalidResponse(String),

    #[error("No {0} in response")]
    MissingField(&'static str),
}

/// Token set obtained from the provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// Raw token endpoint body; every field is checked before use
#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

/// Confidential client for the provider's token endpoint
#[derive(Clone)]
pub struct OidcProvider {
    client_id: String,
    client_secret: String,
    token_url: String,
    redirect_uri: String,
    scope: String,
    http_client: Client,
}

impl OidcProvider {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            client_id: config.client.oidc_client_id.clone(),
            client_secret: config.oidc_client_secret.clone(),
            token_url: config.oidc_token_url.clone(),
            redirect_uri: config.client.redirect_uri(),
            scope: config.client.oidc_scope.clone(),
            http_client: Client::new(),
        }
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, ProviderError> {
        #[derive(Serialize)]
        struct CodeRequest<'a> {
            code: &'a str,
            client_id: &'a str,
            client_secret: &'a str,
            redirect_uri: &'a str,
            grant_type: &'a str,
            scope: &'a str,
        }

        let request_body = CodeRequest {
            code,
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            redirect_uri: &self.redirect_uri,
            grant_type: "authorization_code",
            scope: &self.scope,
        };

        info!(code_length = code.len(), "Exchanging authorization code with provider");

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&request_body)
            .send()
            .await?;

        self.parse_token_response(response).await
    }

    /// Exchange a refresh token for a new token set
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<ProviderTokens, ProviderError> {
        #[derive(Serialize)]
        struct RefreshRequest<'a> {
            client_id: &'a str,
            client_secret: &'a str,
            grant_type: &'a str,
            refresh_token: &'a str,
        }

        let request_body = RefreshRequest {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            grant_type: "refresh_token",
            refresh_token,
        };

        info!("Refreshing tokens with provider");

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&request_body)
            .send()
            .await?;

        self.parse_token_response(response).await
    }

    async fn parse_token_response(
        &self,
        response: reqwest::Response,
    ) -> Result<ProviderTokens, ProviderError> {
        let status = response.status();

        if !status.is_success() {
            #[derive(Deserialize)]
            struct ErrorResponse {
                error: String,
                error_description: Option<String>,
            }

            warn!(status = %status, "Provider token endpoint returned an error");

            return match response.json::<ErrorResponse>().await {
                Ok(error_response) => Err(ProviderError::OAuthError {
                    error: error_response.error,
                    error_description: error_response
                        .error_description
                        .unwrap_or_else(|| "No description provided".to_string()),
                }),
                Err(_) => Err(ProviderError::Status {
                    status: status.as_u16(),
                }),
            };
        }

        let raw: RawTokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let access_token = raw
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(ProviderError::MissingField("access token"))?;
        let expires_in = raw
            .expires_in
            .filter(|e| *e > 0)
            .ok_or(ProviderError::MissingField("expires-in"))?;
        let refresh_token = raw
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(ProviderError::MissingField("refresh token"))?;

        Ok(ProviderTokens {
            access_token,
            refresh_token,
            expires_in,
        })
    }
}
