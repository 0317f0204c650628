//! Authorization configuration.
//!
//! All endpoints and identifiers are explicit configuration injected at
//! construction; nothing in this crate reads ambient globals.

use crate::error::{AuthError, AuthResult};
use std::path::PathBuf;

/// Default authorization server base URL.
pub const DEFAULT_AUTH_URL: &str = "https://login.yotoplay.com";

/// Default content API base URL, used as the OAuth audience.
pub const DEFAULT_API_URL: &str = "https://api.yotoplay.com";

/// Public client identifier registered with the authorization server.
pub const CLIENT_ID: &str = "sRkOnRmZakNzXnOPFGPT0UdahpdUuyxp";

/// Scopes requested during device authorization.
pub const SCOPE: &str = "openid profile offline_access";

/// Configuration for the credential components.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Authorization server base URL.
    pub auth_url: String,
    /// OAuth client identifier.
    pub client_id: String,
    /// Scopes requested during device authorization.
    pub scope: String,
    /// Audience (the content API) requested during device authorization.
    pub audience: String,
    /// Path of the credential file.
    pub credentials_path: PathBuf,
}

impl AuthConfig {
    /// Build a config from the defaults, honoring `YOTO_AUTH_URL` and
    /// `YOTO_API_URL` overrides and the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn from_env() -> AuthResult<Self> {
        let credentials_path = crate::default_credentials_path().ok_or(AuthError::NoConfigDir)?;
        Ok(Self {
            auth_url: std::env::var("YOTO_AUTH_URL")
                .unwrap_or_else(|_| DEFAULT_AUTH_URL.to_string()),
            client_id: CLIENT_ID.to_string(),
            scope: SCOPE.to_string(),
            audience: std::env::var("YOTO_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            credentials_path,
        })
    }

    /// Build a config against a specific authorization server and
    /// credential path. Useful for testing.
    pub fn with_paths(auth_url: impl Into<String>, credentials_path: PathBuf) -> Self {
        Self {
            auth_url: auth_url.into(),
            client_id: CLIENT_ID.to_string(),
            scope: SCOPE.to_string(),
            audience: DEFAULT_API_URL.to_string(),
            credentials_path,
        }
    }

    /// The token endpoint on the authorization server.
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth/token", self.auth_url.trim_end_matches('/'))
    }

    /// The device authorization endpoint on the authorization server.
    pub fn device_code_endpoint(&self) -> String {
        format!("{}/oauth/device/code", self.auth_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_strip_trailing_slash() {
        let config = AuthConfig::with_paths("http://localhost:9/", PathBuf::from("/tmp/c.json"));
        assert_eq!(config.token_endpoint(), "http://localhost:9/oauth/token");
        assert_eq!(
            config.device_code_endpoint(),
            "http://localhost:9/oauth/device/code"
        );
    }
}
