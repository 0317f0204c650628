//! Transparent access-token acquisition.

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::store::{Credential, CredentialStore};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Token endpoint response for both the refresh and device-code grants.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token, in seconds.
    pub expires_in: i64,
}

impl TokenResponse {
    /// Turn the response into a credential, carrying over `old_refresh`
    /// when the server omitted a replacement.
    pub(crate) fn into_credential(self, old_refresh: Option<String>, now_ms: i64) -> Credential {
        Credential {
            access_token: Some(self.access_token),
            refresh_token: self.refresh_token.or(old_refresh),
            expires_at: Some(now_ms + self.expires_in * 1000),
        }
    }
}

/// Produces a currently-valid access token, transparently refreshing.
///
/// Each tool invocation calls [`TokenProvider::access_token`] exactly once
/// and reuses the result for every HTTP request of that operation. The
/// credential is re-loaded from the durable store on every call; nothing
/// is cached in memory across invocations.
pub struct TokenProvider {
    client: reqwest::Client,
    config: AuthConfig,
    store: CredentialStore,
}

impl TokenProvider {
    /// Create a provider over the configured credential file.
    pub fn new(config: AuthConfig) -> Self {
        let store = CredentialStore::new(config.credentials_path.clone());
        Self {
            client: reqwest::Client::new(),
            config,
            store,
        }
    }

    /// The underlying credential store.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Get a valid access token.
    ///
    /// Fast path: the stored token is unexpired and returned without any
    /// network call. Otherwise a single refresh exchange is attempted;
    /// there are no retries.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::AuthRequired`] when no usable token exists
    /// and the refresh is impossible or rejected; the operator must run
    /// the interactive device authorization flow.
    pub async fn access_token(&self) -> AuthResult<String> {
        let credential = self.store.load().await;
        let now_ms = crate::current_time_ms();

        if let Some(token) = credential.usable_access_token(now_ms) {
            debug!("Using stored access token");
            return Ok(token.to_string());
        }

        let Some(refresh_token) = credential.refresh_token.clone() else {
            return Err(AuthError::AuthRequired);
        };

        info!("Access token expired, refreshing");
        let refreshed = match self.refresh(&refresh_token).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                return Err(AuthError::AuthRequired);
            }
        };

        let updated = refreshed.into_credential(Some(refresh_token), crate::current_time_ms());
        let token = updated
            .access_token
            .clone()
            .ok_or(AuthError::AuthRequired)?;
        self.store.save(&updated).await?;

        Ok(token)
    }

    /// One refresh-grant exchange against the token endpoint.
    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenResponse> {
        let response = self
            .client
            .post(self.config.token_endpoint())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.config.client_id.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Refresh rejected by authorization server");
            return Err(AuthError::AuthRequired);
        }

        Ok(response.json().await?)
    }
}
