use crate::auth::has_access_token_in_cookies;
use crate::config::ServerConfig;
use crate::oauth::{logout_handler, refresh_token_handler, token_handler, OidcProvider};
use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Where unauthenticated visitors are sent
pub const LOGIN_PATH: &str = "/oidc/login";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub oauth_provider: Arc<OidcProvider>,
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Authenticated landing page: requires the access-token cookie
async fn home(headers: HeaderMap) -> Response {
    if !has_access_token_in_cookies(&headers) {
        debug!("No access token cookie, redirecting to login");
        return (StatusCode::FOUND, [(header::LOCATION, LOGIN_PATH)]).into_response();
    }

    (StatusCode::OK, "OK").into_response()
}

/// Create and configure the HTTP server
pub fn create_app(config: Arc<ServerConfig>, oauth_provider: Arc<OidcProvider>) -> Router {
    let state = AppState {
        config,
        oauth_provider,
    };

    Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .route("/oidc/token", post(token_handler))
        .route("/oidc/refresh-token", post(refresh_token_handler))
        .route("/oidc/logout", get(logout_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server until ctrl-c
pub async fn run_server(config: Arc<ServerConfig>) -> Result<(), Box<dyn std::error::Error>> {
    let oauth_provider = Arc::new(OidcProvider::new(&config));
    let port = config.port;

    let app = create_app(config.clone(), oauth_provider);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("OIDC HTTP server listening on {}", addr);
    info!("Token endpoint: {}/oidc/token", config.client.base_url());

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down HTTP server");
        })
        .await?;
    Ok(())
}
