pub mod browser;
pub mod cookies;
pub mod oidc;
pub mod types;

pub use browser::{Browser, RecordingBrowser};
pub use cookies::{
    access_token_from_cookies, clear_cookie_header, compute_set_cookie_header,
    has_access_token_in_cookies, ACCESS_TOKEN_COOKIE,
};
pub use oidc::{
    OidcAuth, ACCESS_TOKEN_EXPIRES_AT_KEY, OAUTH_STATE_KEY, REFRESH_TOKEN_KEY, TOKEN_LIMIT_MS,
};
pub use types::{AuthError, TokenResponse};
