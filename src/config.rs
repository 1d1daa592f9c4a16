use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Scope requested when `OIDC_SCOPE` is not set
pub const DEFAULT_SCOPE: &str = "offline_access";

/// Port used when neither `PORT` nor the config file provides one
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration value: {0}")]
    Missing(&'static str),

    #[error("Configuration file not found at {path}: {reason}")]
    FileNotFound { path: String, reason: String },

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Invalid URL in {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::error::Error),
}

/// Configuration file format (for deserialization)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    application_name: String,
    oidc_client_id: String,
    oidc_client_secret: String,
    oidc_login_url: String,
    oidc_token_url: String,
    oidc_logout_url: String,
    base_url: String,
    domain: String,
    #[serde(default)]
    oidc_scope: Option<String>,
    #[serde(default)]
    port: Option<u16>,
}

/// Values the browser-side flow needs. Nothing in here is secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub application_name: String,
    pub oidc_client_id: String,
    pub base_url: String,
    pub oidc_login_url: String,
    pub domain: String,
    pub oidc_logout_url: String,
    pub oidc_scope: String,
}

/// Server-only configuration, a superset of [`ClientConfig`]
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub client: ClientConfig,
    pub oidc_client_secret: String,
    pub oidc_token_url: String,
    pub port: u16,
}

impl ClientConfig {
    /// Load client configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build client configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            application_name: required(&lookup, "APPLICATION_NAME")?,
            oidc_client_id: required(&lookup, "OIDC_CLIENT_ID")?,
            base_url: required(&lookup, "BASE_URL")?,
            oidc_login_url: required(&lookup, "OIDC_LOGIN_URL")?,
            domain: required(&lookup, "DOMAIN")?,
            oidc_logout_url: required(&lookup, "OIDC_LOGOUT_URL")?,
            oidc_scope: lookup("OIDC_SCOPE")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the values the authorization flow cannot work without.
    ///
    /// Called at load time and again by every flow operation, since a
    /// `ClientConfig` can also be assembled by hand.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_empty(&self.application_name, "APPLICATION_NAME")?;
        non_empty(&self.oidc_client_id, "OIDC_CLIENT_ID")?;
        non_empty(&self.base_url, "BASE_URL")?;
        non_empty(&self.oidc_login_url, "OIDC_LOGIN_URL")?;
        non_empty(&self.oidc_logout_url, "OIDC_LOGOUT_URL")?;

        parse_url(&self.base_url, "BASE_URL")?;
        parse_url(&self.oidc_login_url, "OIDC_LOGIN_URL")?;
        parse_url(&self.oidc_logout_url, "OIDC_LOGOUT_URL")?;
        Ok(())
    }

    /// `BASE_URL` without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Redirect URI registered with the provider
    pub fn redirect_uri(&self) -> String {
        format!("{}/oidc/callback", self.base_url())
    }

    /// Local development hosts do not get the `Secure` cookie attribute
    pub fn is_local_development(&self) -> bool {
        self.base_url.contains("localhost") || self.base_url.contains("127.0.0.1")
    }
}

impl ServerConfig {
    /// Load server configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build server configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client = ClientConfig::from_lookup(&lookup)?;
        let oidc_client_secret = required(&lookup, "OIDC_CLIENT_SECRET")?;
        let oidc_token_url = required(&lookup, "OIDC_TOKEN_URL")?;
        parse_url(&oidc_token_url, "OIDC_TOKEN_URL")?;

        let port = match lookup("PORT") {
            Some(p) => p.trim().parse().map_err(|_| ConfigError::InvalidPort(p))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            client,
            oidc_client_secret,
            oidc_token_url,
            port,
        })
    }

    /// Load configuration from `.env`/environment, falling back to the
    /// config file at ~/.config/oidc-web-auth/config.json when a required
    /// variable is missing.
    pub fn from_env_or_file() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        match Self::from_env() {
            Ok(config) => Ok(config),
            Err(ConfigError::Missing(name)) => {
                let path = Self::get_config_path()?;
                if !path.exists() {
                    return Err(ConfigError::Missing(name));
                }
                Self::from_file(&path)
            }
            Err(e) => Err(e),
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::FileNotFound {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let file: ConfigFile = serde_json::from_str(&contents)?;

        let client = ClientConfig {
            application_name: file.application_name,
            oidc_client_id: file.oidc_client_id,
            base_url: file.base_url,
            oidc_login_url: file.oidc_login_url,
            domain: file.domain,
            oidc_logout_url: file.oidc_logout_url,
            oidc_scope: file.oidc_scope.unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
        };
        client.validate()?;

        non_empty(&file.oidc_client_secret, "OIDC_CLIENT_SECRET")?;
        non_empty(&file.oidc_token_url, "OIDC_TOKEN_URL")?;
        parse_url(&file.oidc_token_url, "OIDC_TOKEN_URL")?;

        Ok(Self {
            client,
            oidc_client_secret: file.oidc_client_secret,
            oidc_token_url: file.oidc_token_url,
            port: file.port.unwrap_or(DEFAULT_PORT),
        })
    }

    /// Get the configuration file path: ~/.config/oidc-web-auth/config.json
    fn get_config_path() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".config/oidc-web-auth/config.json"))
            .ok_or_else(|| ConfigError::FileNotFound {
                path: "~/.config/oidc-web-auth/config.json".to_string(),
                reason: "Could not determine home directory".to_string(),
            })
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn non_empty(value: &str, name: &'static str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(())
}

fn parse_url(value: &str, name: &'static str) -> Result<url::Url, ConfigError> {
    url::Url::parse(value).map_err(|source| ConfigError::InvalidUrl { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn server_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("OIDC_CLIENT_ID", "test"),
            ("OIDC_CLIENT_SECRET", "secretTest"),
            ("OIDC_LOGIN_URL", "http://oidc.com/login"),
            ("OIDC_TOKEN_URL", "http://oidc.com/token"),
            ("OIDC_LOGOUT_URL", "http://oidc.com/logout"),
            ("BASE_URL", "http://localhost:3000"),
            ("DOMAIN", "test"),
            ("APPLICATION_NAME", "test"),
        ])
    }

    #[test]
    fn test_server_config_from_lookup() {
        let vars = server_vars();
        let config = ServerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.client.oidc_client_id, "test");
        assert_eq!(config.oidc_client_secret, "secretTest");
        assert_eq!(config.client.oidc_scope, DEFAULT_SCOPE);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_client_config_ignores_server_values() {
        let vars = server_vars();
        let client = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        let json = serde_json::to_value(&client).unwrap();
        assert!(json.get("oidc_client_secret").is_none());
        assert!(json.get("oidc_token_url").is_none());
    }

    #[test]
    fn test_missing_variable_is_reported_by_name() {
        let mut vars = server_vars();
        vars.remove("OIDC_CLIENT_ID");

        let result = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert!(matches!(result, Err(ConfigError::Missing("OIDC_CLIENT_ID"))));
    }

    #[test]
    fn test_blank_variable_counts_as_missing() {
        let mut vars = server_vars();
        vars.insert("OIDC_CLIENT_SECRET", "   ");

        let result = ServerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert!(matches!(result, Err(ConfigError::Missing("OIDC_CLIENT_SECRET"))));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut vars = server_vars();
        vars.insert("OIDC_LOGIN_URL", "not a url");

        let result = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidUrl { name: "OIDC_LOGIN_URL", .. })
        ));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut vars = server_vars();
        vars.insert("PORT", "eighty");

        let result = ServerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidPort(_))));
    }

    #[test]
    fn test_local_development_detection() {
        let vars = server_vars();
        let mut client = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert!(client.is_local_development());

        client.base_url = "http://127.0.0.1:8080".to_string();
        assert!(client.is_local_development());

        client.base_url = "https://app.example.com".to_string();
        assert!(!client.is_local_development());
    }

    #[test]
    fn test_redirect_uri_trims_trailing_slash() {
        let vars = server_vars();
        let mut client = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        client.base_url = "http://localhost:3000/".to_string();

        assert_eq!(client.redirect_uri(), "http://localhost:3000/oidc/callback");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            serde_json::json!({
                "application_name": "test",
                "oidc_client_id": "test",
                "oidc_client_secret": "secret",
                "oidc_login_url": "http://oidc.com/login",
                "oidc_token_url": "http://oidc.com/token",
                "oidc_logout_url": "http://oidc.com/logout",
                "base_url": "http://localhost:3000",
                "domain": "test",
                "port": 4000
            })
            .to_string(),
        )
        .unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.client.oidc_scope, DEFAULT_SCOPE);
        assert_eq!(config.oidc_token_url, "http://oidc.com/token");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        for (k, v) in server_vars() {
            std::env::set_var(k, v);
        }
        std::env::set_var("OIDC_SCOPE", "openid offline_access");
        std::env::set_var("PORT", "3100");

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.client.oidc_scope, "openid offline_access");
        assert_eq!(config.port, 3100);

        for k in server_vars().keys() {
            std::env::remove_var(k);
        }
        std::env::remove_var("OIDC_SCOPE");
        std::env::remove_var("PORT");
    }

    #[test]
    #[serial]
    fn test_from_env_missing() {
        for k in server_vars().keys() {
            std::env::remove_var(k);
        }

        let result = ClientConfig::from_env();
        assert!(matches!(result, Err(ConfigError::Missing(_))));
    }
}
