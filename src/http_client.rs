use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response body: {0}")]
    Parse(String),

    #[error("Response does not match the expected shape: {0}")]
    Schema(String),

    #[error("Invalid header {0}")]
    InvalidHeader(String),
}

/// Extra request headers as `(name, value)` pairs
pub type Headers<'a> = &'a [(&'a str, &'a str)];

/// JSON-over-HTTP transport used by the authorization flow.
///
/// Implementations perform the call with credentials (cookies) included and
/// return the parsed JSON body. Use the typed [`post`](#method.post) and
/// [`get`](#method.get) helpers on `dyn HttpClient` to validate the body
/// against a response type.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value, headers: Headers<'_>)
        -> Result<Value, HttpError>;

    async fn get_json(&self, url: &str, headers: Headers<'_>) -> Result<Value, HttpError>;
}

impl dyn HttpClient {
    /// POST `body` as JSON and validate the response as `T`
    pub async fn post<T: DeserializeOwned>(&self, url: &str, body: &Value) -> Result<T, HttpError> {
        let json = self.post_json(url, body, &[]).await?;
        validate(json)
    }

    /// GET `url` and validate the response as `T`
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        let json = self.get_json(url, &[]).await?;
        validate(json)
    }
}

/// Validate an untyped JSON value against the shape of `T`, then construct it
pub fn validate<T: DeserializeOwned>(value: Value) -> Result<T, HttpError> {
    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "Response failed schema validation");
        HttpError::Schema(e.to_string())
    })
}

/// [`HttpClient`] backed by reqwest with a persistent cookie store
#[derive(Clone)]
pub struct ReqwestHttpClient {
    http_client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self, HttpError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("oidc-web-auth/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .build()?;

        Ok(Self { http_client })
    }

    /// Wrap a preconfigured reqwest client (redirect policy, cookie jar)
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    fn header_map(headers: Headers<'_>) -> Result<HeaderMap, HttpError> {
        let mut map = HeaderMap::new();
        map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| HttpError::InvalidHeader(name.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| HttpError::InvalidHeader(name.as_str().to_string()))?;
            map.insert(name, value);
        }

        Ok(map)
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, HttpError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(
                status = %status,
                error_type = "api_error",
                "Request failed with non-2xx status"
            );
            return Err(HttpError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!(status = %status, body_length = text.len(), "Received response");

        serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, error_type = "json_parse_failed", "Failed to parse response");
            HttpError::Parse(e.to_string())
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        headers: Headers<'_>,
    ) -> Result<Value, HttpError> {
        debug!(url = %url, "POST");

        let response = self
            .http_client
            .post(url)
            .headers(Self::header_map(headers)?)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, url = %url, error_type = "http_request_failed", "POST failed");
                HttpError::Network(e)
            })?;

        Self::read_json(response).await
    }

    async fn get_json(&self, url: &str, headers: Headers<'_>) -> Result<Value, HttpError> {
        debug!(url = %url, "GET");

        let response = self
            .http_client
            .get(url)
            .headers(Self::header_map(headers)?)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, url = %url, error_type = "http_request_failed", "GET failed");
                HttpError::Network(e)
            })?;

        Self::read_json(response).await
    }
}

impl HttpError {
    /// HTTP status of a non-2xx response, if that is what failed
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => StatusCode::from_u16(*status).ok(),
            _ => None,
        }
    }
}
