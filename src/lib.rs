pub mod auth;
pub mod config;
pub mod http_client;
pub mod http_server;
pub mod oauth;
pub mod store;

pub use auth::{AuthError, Browser, OidcAuth, RecordingBrowser, TokenResponse};
pub use config::{ClientConfig, ConfigError, ServerConfig};
pub use http_client::{HttpClient, HttpError, ReqwestHttpClient};
pub use http_server::{create_app, run_server, AppState};
pub use oauth::{OidcProvider, ProviderError};
pub use store::{KvStore, LocalFileStore, MemoryStore, StoreError};
