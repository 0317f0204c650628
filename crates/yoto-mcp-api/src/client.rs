//! HTTP client for the Yoto content API.

use crate::card::{Card, CardDocument, CardSummary};
use crate::error::{ApiError, ApiResult};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Default content API base URL.
pub const DEFAULT_API_URL: &str = "https://api.yotoplay.com";

/// Transcode-status polling interval.
const TRANSCODE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Maximum transcode-status polls before giving up.
const TRANSCODE_POLL_ATTEMPTS: u32 = 30;

/// Configuration for the content API client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Content API base URL.
    pub api_url: String,
    /// Interval between transcode-status polls.
    pub poll_interval: Duration,
    /// Maximum transcode-status polls.
    pub poll_attempts: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: TRANSCODE_POLL_INTERVAL,
            poll_attempts: TRANSCODE_POLL_ATTEMPTS,
        }
    }
}

impl ApiConfig {
    /// Build a config from the defaults, honoring the `YOTO_API_URL`
    /// override.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("YOTO_API_URL") {
            config.api_url = url;
        }
        config
    }
}

/// Yoto content API client.
///
/// All requests are bearer-authenticated with a token the caller already
/// resolved; one token is reused for every request of a logical operation.
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) poll_interval: Duration,
    pub(crate) poll_attempts: u32,
}

/// Envelope for `GET /content/{cardId}` and card create/update responses.
#[derive(Debug, Clone, Deserialize)]
struct CardEnvelope {
    card: Card,
}

/// Envelope for `GET /content?type=myo`.
#[derive(Debug, Clone, Deserialize)]
struct CardListEnvelope {
    #[serde(default)]
    cards: Vec<CardSummary>,
}

impl ApiClient {
    /// Create a client against the production API.
    pub fn new() -> Self {
        Self::with_config(ApiConfig::default())
    }

    /// Create a client with explicit configuration.
    pub fn with_config(config: ApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            poll_interval: config.poll_interval,
            poll_attempts: config.poll_attempts,
        }
    }

    /// Create a card from a full document. Returns the created card with
    /// its assigned id.
    pub async fn create_card(&self, access_token: &str, document: &CardDocument) -> ApiResult<Card> {
        let url = format!("{}/content", self.base_url);
        info!(title = %document.title, "Creating card");

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(document)
            .send()
            .await?;

        let envelope: CardEnvelope = self.check_response_json(response).await?;
        Ok(envelope.card)
    }

    /// Fetch a card by id.
    pub async fn get_card(&self, access_token: &str, card_id: &str) -> ApiResult<Card> {
        let url = format!("{}/content/{}", self.base_url, card_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let envelope: CardEnvelope = self.check_response_json(response).await?;
        Ok(envelope.card)
    }

    /// List the MYO cards in the operator's library.
    pub async fn list_cards(&self, access_token: &str) -> ApiResult<Vec<CardSummary>> {
        let url = format!("{}/content", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .query(&[("type", "myo")])
            .send()
            .await?;

        let envelope: CardListEnvelope = self.check_response_json(response).await?;
        Ok(envelope.cards)
    }

    /// Replace a card's document in full. The API's replace semantics are
    /// idempotent; there are no partial writes.
    pub async fn update_card(
        &self,
        access_token: &str,
        card_id: &str,
        document: &CardDocument,
    ) -> ApiResult<Card> {
        let url = format!("{}/content/{}", self.base_url, card_id);
        info!(card_id, "Updating card");

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(document)
            .send()
            .await?;

        let envelope: CardEnvelope = self.check_response_json(response).await?;
        Ok(envelope.card)
    }

    /// Check response status, preserving the server body in the error.
    pub(crate) async fn check_response(&self, response: reqwest::Response) -> ApiResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, body = %body, "API rejected request");
        Err(ApiError::RemoteRejected {
            status: status.as_u16(),
            body,
        })
    }

    /// Check response status and parse the JSON body against `T`.
    pub(crate) async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> ApiResult<T> {
        let response = self.check_response(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::MalformedResponse(e.to_string()))
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}
