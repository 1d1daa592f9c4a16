use crate::config::ClientConfig;
use axum::http::{header, HeaderMap};
use cookie::{Cookie, SameSite};

/// Name of the HTTP-only cookie holding the access token
pub const ACCESS_TOKEN_COOKIE: &str = "Authorization";

/// Build the `Set-Cookie` value for the access-token cookie.
///
/// The cookie is HTTP-only, `Path=/`, `SameSite=Lax`, scoped to `DOMAIN`,
/// and `Secure` unless `BASE_URL` points at a local development host. It is a
/// session cookie; with `expire_now` it carries `Max-Age=0` so the browser
/// drops it immediately.
pub fn compute_set_cookie_header(config: &ClientConfig, token: &str, expire_now: bool) -> String {
    let mut cookie = Cookie::new(ACCESS_TOKEN_COOKIE, token.to_string());
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(!config.is_local_development());

    if !config.domain.trim().is_empty() {
        cookie.set_domain(config.domain.clone());
    }

    if expire_now {
        cookie.set_max_age(cookie::time::Duration::seconds(0));
    }

    cookie.to_string()
}

/// `Set-Cookie` value that removes the access-token cookie
pub fn clear_cookie_header(config: &ClientConfig) -> String {
    compute_set_cookie_header(config, "", true)
}

/// Whether the request carries a non-empty access-token cookie.
///
/// Only existence is checked; the token is not validated.
pub fn has_access_token_in_cookies(headers: &HeaderMap) -> bool {
    access_token_from_cookies(headers).is_some()
}

/// Access token from the request's `Cookie` header(s)
pub fn access_token_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value.to_string()))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == ACCESS_TOKEN_COOKIE && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: &str) -> ClientConfig {
        ClientConfig {
            application_name: "test".to_string(),
            oidc_client_id: "test".to_string(),
            base_url: base_url.to_string(),
            oidc_login_url: "http://oidc.com/login".to_string(),
            domain: "test".to_string(),
            oidc_logout_url: "http://oidc.com/logout".to_string(),
            oidc_scope: "offline_access".to_string(),
        }
    }

    #[test]
    fn test_set_cookie_attributes() {
        let header = compute_set_cookie_header(&test_config("https://app.example.com"), "tok", false);
        let cookie = Cookie::parse(header.clone()).unwrap();

        assert_eq!(cookie.name(), ACCESS_TOKEN_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.domain(), Some("test"));
        assert!(cookie.max_age().is_none(), "session cookie expected: {}", header);
    }

    #[test]
    fn test_not_secure_on_localhost() {
        let header = compute_set_cookie_header(&test_config("http://localhost:3000"), "tok", false);
        let cookie = Cookie::parse(header).unwrap();
        assert_ne!(cookie.secure(), Some(true));

        let header = compute_set_cookie_header(&test_config("http://127.0.0.1:3000"), "tok", false);
        let cookie = Cookie::parse(header).unwrap();
        assert_ne!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_expire_now() {
        let header = compute_set_cookie_header(&test_config("https://app.example.com"), "tok", true);
        let cookie = Cookie::parse(header).unwrap();

        assert_eq!(cookie.max_age(), Some(cookie::time::Duration::seconds(0)));
        assert_eq!(cookie.http_only(), Some(true));
    }

    #[test]
    fn test_clear_cookie_header() {
        let header = clear_cookie_header(&test_config("https://app.example.com"));
        let cookie = Cookie::parse(header).unwrap();

        assert_eq!(cookie.name(), ACCESS_TOKEN_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(cookie::time::Duration::seconds(0)));
    }

    #[test]
    fn test_has_access_token_in_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "session=abc123; Authorization=token456; other=xyz".parse().unwrap(),
        );

        assert!(has_access_token_in_cookies(&headers));
        assert_eq!(
            access_token_from_cookies(&headers),
            Some("token456".to_string())
        );
    }

    #[test]
    fn test_no_access_token_cookie() {
        let mut headers = HeaderMap::new();
        assert!(!has_access_token_in_cookies(&headers));

        headers.insert(header::COOKIE, "session=abc123; other=xyz".parse().unwrap());
        assert!(!has_access_token_in_cookies(&headers));
    }

    #[test]
    fn test_empty_access_token_cookie_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "Authorization=; other=xyz".parse().unwrap());

        assert!(!has_access_token_in_cookies(&headers));
    }

    #[test]
    fn test_cookie_split_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, "session=abc123".parse().unwrap());
        headers.append(header::COOKIE, "Authorization=token456".parse().unwrap());

        assert!(has_access_token_in_cookies(&headers));
    }
}
