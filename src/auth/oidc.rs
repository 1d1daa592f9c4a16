use super::browser::Browser;
use super::types::{AuthError, TokenResponse};
use crate::config::ClientConfig;
use crate::http_client::HttpClient;
use crate::store::{KvStore, StoreError};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

pub const OAUTH_STATE_KEY: &str = "oauth_state";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const ACCESS_TOKEN_EXPIRES_AT_KEY: &str = "access_token_expires_at";

/// Refresh the access token this long before it expires (2 minutes)
pub const TOKEN_LIMIT_MS: i64 = 2 * 60 * 1000;

/// Authorization-code flow with silent refresh.
///
/// All persistence goes through the injected [`KvStore`], all network calls
/// through the injected [`HttpClient`] and all browser effects through the
/// injected [`Browser`].
pub struct OidcAuth {
    config: ClientConfig,
    store: Arc<dyn KvStore>,
    http_client: Arc<dyn HttpClient>,
    browser: Arc<dyn Browser>,
}

impl OidcAuth {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn KvStore>,
        http_client: Arc<dyn HttpClient>,
        browser: Arc<dyn Browser>,
    ) -> Self {
        Self {
            config,
            store,
            http_client,
            browser,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start a login: store a fresh state token and build the provider URL.
    ///
    /// Navigates the browser and returns `None`, or with `dont_redirect`
    /// returns the URL without navigating.
    pub fn handle_redirect_to_oidc_provider(
        &self,
        dont_redirect: bool,
    ) -> Result<Option<Url>, AuthError> {
        self.config.validate()?;

        let state = Uuid::new_v4().to_string();
        self.store.set_item(OAUTH_STATE_KEY, &state)?;

        let mut url = Url::parse(&self.config.oidc_login_url)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.oidc_client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.config.redirect_uri())
            .append_pair("state", &state)
            .append_pair("scope", &self.config.oidc_scope);

        info!(
            login_url = %self.config.oidc_login_url,
            dont_redirect = dont_redirect,
            "Starting OIDC authorization flow"
        );

        if dont_redirect {
            return Ok(Some(url));
        }

        self.browser.navigate(&url);
        Ok(None)
    }

    /// Complete a login from the provider's callback parameters.
    ///
    /// The stored state is validated and deleted before the code is
    /// exchanged; a failed exchange leaves no token pair behind.
    pub async fn handle_oidc_callback(&self, code: &str, state: &str) -> Result<(), AuthError> {
        if code.is_empty() {
            warn!("OIDC callback without authorization code");
            return Err(AuthError::MissingCode);
        }

        let stored_state = self.store.get_item(OAUTH_STATE_KEY)?;
        if stored_state != state {
            warn!("State parameter mismatch - possible CSRF attack");
            return Err(AuthError::StateMismatch);
        }
        self.store.remove_item(OAUTH_STATE_KEY)?;

        info!(code_length = code.len(), "State validated, exchanging authorization code");

        let tokens = self.send_access_token_request(code).await?;
        self.store_refresh_token_and_expiration(&tokens)?;

        info!(expires_in = tokens.expires_in, "Login completed");
        Ok(())
    }

    /// Refresh with the default two-minute margin
    pub async fn handle_refresh_access_token_if_needed_default(&self) -> Result<bool, AuthError> {
        self.handle_refresh_access_token_if_needed(TOKEN_LIMIT_MS).await
    }

    /// Refresh the token pair when the access token expires within `limit_ms`.
    ///
    /// Returns `true` when a refresh happened and `false` when the access
    /// token is still good (no network call is made).
    pub async fn handle_refresh_access_token_if_needed(
        &self,
        limit_ms: i64,
    ) -> Result<bool, AuthError> {
        if !self.is_access_token_expiring(limit_ms)? {
            debug!("Access token still valid, no refresh needed");
            return Ok(false);
        }

        let refresh_token = match self.store.get_item(REFRESH_TOKEN_KEY) {
            Ok(token) if !token.is_empty() => token,
            Ok(_) | Err(StoreError::NotFound(_)) => return Err(AuthError::MissingRefreshToken),
            Err(e) => return Err(e.into()),
        };

        info!("Access token expiring, refreshing");
        let tokens = self.send_refresh_token_request(&refresh_token).await?;
        self.store_refresh_token_and_expiration(&tokens)?;

        info!(expires_in = tokens.expires_in, "Access token refreshed");
        Ok(true)
    }

    /// Forget the session and send the user through `{BASE_URL}/oidc/logout`.
    ///
    /// The access-token cookie is HTTP-only, so only that route can expire
    /// it; it then redirects to the provider's logout page.
    pub fn handle_logout(&self, dont_redirect: bool) -> Result<Option<Url>, AuthError> {
        self.browser.clear_cookies();

        for key in [REFRESH_TOKEN_KEY, ACCESS_TOKEN_EXPIRES_AT_KEY] {
            match self.store.remove_item(key) {
                Ok(()) | Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.config.validate()?;
        let url = Url::parse(&format!("{}/oidc/logout", self.config.base_url()))?;

        info!(logout_url = %url, dont_redirect = dont_redirect, "Logged out");

        if dont_redirect {
            return Ok(Some(url));
        }

        self.browser.navigate(&url);
        Ok(None)
    }

    /// Unparsable expiry values count as expiring
    fn is_access_token_expiring(&self, limit_ms: i64) -> Result<bool, AuthError> {
        let stored = self.store.get_item(ACCESS_TOKEN_EXPIRES_AT_KEY)?;

        let Ok(expires_at) = stored.trim().parse::<i64>() else {
            warn!(value = %stored, "Failed to parse access token expiry, forcing refresh");
            return Ok(true);
        };

        let now = Utc::now().timestamp_millis();
        Ok(expires_at.saturating_sub(now) < limit_ms)
    }

    fn store_refresh_token_and_expiration(&self, tokens: &TokenResponse) -> Result<(), AuthError> {
        let expires_in_ms = i64::try_from(tokens.expires_in)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let expires_at = Utc::now().timestamp_millis().saturating_add(expires_in_ms);

        let previous = match self.store.get_item(REFRESH_TOKEN_KEY) {
            Ok(token) => Some(token),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };

        self.store.set_item(REFRESH_TOKEN_KEY, &tokens.refresh_token)?;

        if let Err(e) = self
            .store
            .set_item(ACCESS_TOKEN_EXPIRES_AT_KEY, &expires_at.to_string())
        {
            warn!(error = %e, "Failed to store token expiry, restoring previous refresh token");
            let restored = match previous {
                Some(token) => self.store.set_item(REFRESH_TOKEN_KEY, &token),
                None => self.store.remove_item(REFRESH_TOKEN_KEY),
            };
            if let Err(restore_err) = restored {
                warn!(error = %restore_err, "Failed to restore previous refresh token");
            }
            return Err(e.into());
        }

        Ok(())
    }

    async fn send_access_token_request(&self, code: &str) -> Result<TokenResponse, AuthError> {
        self.config.validate()?;
        let url = format!("{}/oidc/token", self.config.base_url());

        let tokens = self
            .http_client
            .post::<TokenResponse>(&url, &json!({ "auth_code": code }))
            .await?;
        Ok(tokens)
    }

    async fn send_refresh_token_request(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, AuthError> {
        self.config.validate()?;
        let url = format!("{}/oidc/refresh-token", self.config.base_url());

        let tokens = self
            .http_client
            .post::<TokenResponse>(&url, &json!({ "refresh_token": refresh_token }))
            .await?;
        Ok(tokens)
    }
}
