//! Interactive device-authorization flow.
//!
//! Obtains first credentials: the operator visits a verification URL and
//! enters a short code while we poll the token endpoint at the interval
//! the server dictated, up to a fixed attempt budget.

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::store::Credential;
use crate::token::TokenResponse;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Grant type for the device-code token exchange.
const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Maximum token-exchange attempts before giving up.
const MAX_POLL_ATTEMPTS: u32 = 60;

/// Device authorization session, as returned by the authorization server.
///
/// Ephemeral: lives only for the duration of one authorization attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSession {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: String,
    /// Server-dictated polling interval, in seconds.
    pub interval: u64,
}

/// Runs the interactive device-authorization handshake.
pub struct DeviceAuthorizer {
    client: reqwest::Client,
    config: AuthConfig,
    max_attempts: u32,
}

impl DeviceAuthorizer {
    /// Create an authorizer against the configured authorization server.
    pub fn new(config: AuthConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            max_attempts: MAX_POLL_ATTEMPTS,
        }
    }

    /// Override the polling attempt budget. Useful for testing.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Run the full handshake and return the obtained credential.
    ///
    /// The verification URL and user code are presented on stderr; stdout
    /// stays reserved for the protocol. The caller is responsible for
    /// persisting the returned credential.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::AuthTimeout`] when the operator has not
    /// approved within the attempt budget. Transient exchange failures are
    /// swallowed and counted as normal attempts.
    pub async fn run(&self) -> AuthResult<Credential> {
        let session = self.request_device_session().await?;

        eprintln!();
        eprintln!("Yoto authentication required");
        eprintln!();
        eprintln!("Please visit: {}", session.verification_uri_complete);
        eprintln!("Or go to: {}", session.verification_uri);
        eprintln!("And enter code: {}", session.user_code);
        eprintln!();
        eprintln!("Waiting for authorization...");

        info!(
            interval_secs = session.interval,
            max_attempts = self.max_attempts,
            "Polling for device authorization"
        );

        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(Duration::from_secs(session.interval)).await;

            match self.exchange_device_code(&session.device_code).await {
                Ok(Some(credential)) => {
                    eprintln!("Authentication successful.");
                    info!(attempt, "Device authorization granted");
                    return Ok(credential);
                }
                Ok(None) => {
                    debug!(attempt, "Not yet authorized");
                }
                Err(e) => {
                    // Transient failures count as a normal attempt.
                    warn!(attempt, error = %e, "Device poll failed, continuing");
                }
            }
        }

        Err(AuthError::AuthTimeout)
    }

    /// Start a device authorization session.
    async fn request_device_session(&self) -> AuthResult<DeviceSession> {
        let response = self
            .client
            .post(self.config.device_code_endpoint())
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("scope", self.config.scope.as_str()),
                ("audience", self.config.audience.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// One device-code token exchange. `Ok(None)` means "not yet
    /// authorized"; polling continues.
    async fn exchange_device_code(&self, device_code: &str) -> AuthResult<Option<Credential>> {
        let response = self
            .client
            .post(self.config.token_endpoint())
            .form(&[
                ("grant_type", DEVICE_CODE_GRANT),
                ("device_code", device_code),
                ("client_id", self.config.client_id.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let tokens: TokenResponse = response.json().await?;
        Ok(Some(tokens.into_credential(None, crate::current_time_ms())))
    }
}
