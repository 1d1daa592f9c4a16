use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{error, info, warn};

use super::provider::{ProviderError, ProviderTokens};
use crate::auth::{clear_cookie_header, compute_set_cookie_header, TokenResponse};
use crate::http_server::AppState;

/// Handle POST /oidc/token - Exchange an authorization code for tokens
///
/// Request body: `{"auth_code": "..."}`. On success the access token is set
/// as an HTTP-only cookie and the body carries only the refresh token and
/// its lifetime:
///
/// ```json
/// { "refresh_token": "...", "expires_in": 300 }
/// ```
pub async fn token_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, EndpointError> {
    let auth_code = string_field(&body, "auth_code")?;

    info!(code_length = auth_code.len(), "Token endpoint called");

    let tokens = state.oauth_provider.exchange_code(&auth_code).await?;
    Ok(token_response(&state, tokens))
}

/// Handle POST /oidc/refresh-token - Exchange a refresh token for new tokens
///
/// Request body: `{"refresh_token": "..."}`; response as for `/oidc/token`.
pub async fn refresh_token_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, EndpointError> {
    let refresh_token = string_field(&body, "refresh_token")?;

    info!("Refresh token endpoint called");

    let tokens = state.oauth_provider.refresh_token(&refresh_token).await?;
    Ok(token_response(&state, tokens))
}

/// Handle GET /oidc/logout - Drop the access-token cookie and hand the user
/// to the provider's logout page
pub async fn logout_handler(State(state): State<AppState>) -> Response {
    let client = &state.config.client;

    info!(logout_url = %client.oidc_logout_url, "Logging out");

    (
        StatusCode::FOUND,
        [
            (header::SET_COOKIE, clear_cookie_header(client)),
            (header::LOCATION, client.oidc_logout_url.clone()),
        ],
    )
        .into_response()
}

fn token_response(state: &AppState, tokens: ProviderTokens) -> Response {
    let cookie_header = compute_set_cookie_header(&state.config.client, &tokens.access_token, false);

    info!(expires_in = tokens.expires_in, "Issued access token cookie");

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie_header)],
        Json(TokenResponse {
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
        }),
    )
        .into_response()
}

/// Extract a string field from a JSON request body
fn string_field(body: &[u8], field: &str) -> Result<String, EndpointError> {
    let json: Value = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Failed to parse request body");
        EndpointError::BadRequest(format!("Failed to parse request body: {}", e))
    })?;

    match json.get(field).and_then(Value::as_str) {
        Some(value) => Ok(value.to_string()),
        None => {
            warn!(field = %field, "Missing or non-string field in request body");
            Err(EndpointError::BadRequest(format!("'{}' must be a string", field)))
        }
    }
}

/// Errors from the token route handlers
#[derive(Debug)]
pub enum EndpointError {
    BadRequest(String),
    NoAccessToken,
    Authorization(String),
}

impl From<ProviderError> for EndpointError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingField("access token") => EndpointError::NoAccessToken,
            other => EndpointError::Authorization(other.to_string()),
        }
    }
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            EndpointError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad Request"),
            EndpointError::NoAccessToken => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authorization error, no access token in response",
            ),
            EndpointError::Authorization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Authorization error")
            }
        };

        // details stay in the log, the client only gets the generic message
        error!(status = %status, error = ?self, "OIDC endpoint error");

        (status, message).into_response()
    }
}
