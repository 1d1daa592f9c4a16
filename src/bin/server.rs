//! HTTP server for the trusted side of the OIDC flow
//!
//! Serves `/oidc/token`, `/oidc/refresh-token`, `/oidc/logout`, the
//! authenticated home check and `/health`.

use oidc_web_auth::{run_server, ServerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // LOG_FORMAT=json for production, pretty (or unset) for development
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "oidc_web_auth=info,tower_http=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(log_format = %log_format, "Starting OIDC web auth server");

    let config = Arc::new(ServerConfig::from_env_or_file()?);
    info!(
        application = %config.client.application_name,
        port = config.port,
        "Configuration loaded"
    );

    run_server(config).await
}
