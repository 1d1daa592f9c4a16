//! Server side of the flow: confidential exchange with the identity provider
//! and the `/oidc/*` route handlers

pub mod endpoints;
pub mod provider;

pub use endpoints::{logout_handler, refresh_token_handler, token_handler, EndpointError};
pub use provider::{OidcProvider, ProviderError, ProviderTokens};
