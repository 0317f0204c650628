//! Audio upload and transcode-completion polling.
//!
//! Uploading is a three-step protocol: request an ephemeral upload slot,
//! PUT the raw bytes to the slot's URL, then poll the transcode status
//! until the content hash appears. The hash identifies the audio
//! independently of any card; the same reference can back any number of
//! tracks.

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};
use serde::Deserialize;
use tracing::{debug, info};

/// Content type sent with the audio bytes.
const AUDIO_MIME: &str = "audio/mpeg";

/// An ephemeral upload slot, one per audio asset.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlot {
    pub upload_id: String,
    pub upload_url: String,
}

/// Envelope for the upload-slot request.
#[derive(Debug, Clone, Deserialize)]
struct UploadSlotEnvelope {
    upload: UploadSlot,
}

/// Media properties reported by the transcoder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodedInfo {
    /// Duration in seconds.
    pub duration: f64,
    /// Size of the transcoded asset in bytes.
    pub file_size: u64,
    /// Channel count.
    pub channels: u32,
    /// Audio format identifier.
    pub format: String,
}

/// A finished transcode: the content-addressed reference plus media info.
///
/// Immutable once obtained.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodedAudio {
    /// SHA-256 of the transcoded content; the card-independent reference.
    pub transcoded_sha256: String,
    pub transcoded_info: TranscodedInfo,
}

impl TranscodedAudio {
    /// The `yoto:#<sha256>` URL form used by track documents.
    pub fn track_url(&self) -> String {
        format!("yoto:#{}", self.transcoded_sha256)
    }
}

/// Transcode status as polled; the hash stays absent until the transcoder
/// finishes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscodeRecord {
    #[serde(default)]
    transcoded_sha256: Option<String>,
    #[serde(default)]
    transcoded_info: Option<TranscodedInfo>,
}

/// Envelope for the transcode-status poll.
#[derive(Debug, Clone, Deserialize)]
struct TranscodeEnvelope {
    transcode: TranscodeRecord,
}

impl ApiClient {
    /// Upload raw audio bytes and wait for transcoding to finish.
    ///
    /// # Errors
    ///
    /// - [`ApiError::UploadFailed`] when the slot request or the byte
    ///   upload is rejected; neither is retried.
    /// - [`ApiError::TranscodeTimeout`] when the content hash has not
    ///   appeared within the polling budget.
    pub async fn upload_and_transcode(
        &self,
        access_token: &str,
        audio: Vec<u8>,
    ) -> ApiResult<TranscodedAudio> {
        let slot = self.request_upload_slot(access_token).await?;
        info!(upload_id = %slot.upload_id, bytes = audio.len(), "Uploading audio");

        // Single whole-body PUT; no resumable or chunked behavior.
        let response = self
            .http
            .put(&slot.upload_url)
            .header("Content-Type", AUDIO_MIME)
            .body(audio)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::UploadFailed(format!("HTTP {status}: {body}")));
        }

        self.wait_for_transcode(access_token, &slot.upload_id).await
    }

    /// Request an ephemeral upload slot.
    async fn request_upload_slot(&self, access_token: &str) -> ApiResult<UploadSlot> {
        let url = format!("{}/media/transcode/audio/uploadUrl", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::UploadFailed(format!("HTTP {status}: {body}")));
        }

        let body = response.text().await?;
        let envelope: UploadSlotEnvelope = serde_json::from_str(&body)
            .map_err(|e| ApiError::MalformedResponse(e.to_string()))?;
        Ok(envelope.upload)
    }

    /// Poll the transcode status until the content hash appears.
    ///
    /// A populated hash is the sole completion signal; anything else
    /// (pending record, non-success status, unreadable body) means "not
    /// ready yet" and the loop continues until the attempt budget runs out.
    async fn wait_for_transcode(
        &self,
        access_token: &str,
        upload_id: &str,
    ) -> ApiResult<TranscodedAudio> {
        let url = format!("{}/media/upload/{}/transcoded", self.base_url, upload_id);

        for attempt in 1..=self.poll_attempts {
            tokio::time::sleep(self.poll_interval).await;

            match self.poll_transcode_once(&url, access_token).await {
                Some(record) => {
                    info!(upload_id, attempt, "Transcoding finished");
                    return Ok(record);
                }
                None => {
                    debug!(upload_id, attempt, "Transcode not ready");
                }
            }
        }

        Err(ApiError::TranscodeTimeout)
    }

    /// One status poll. `None` means "not ready yet".
    async fn poll_transcode_once(&self, url: &str, access_token: &str) -> Option<TranscodedAudio> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .query(&[("loudnorm", "false")])
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        let envelope: TranscodeEnvelope = response.json().await.ok()?;
        let sha = envelope.transcode.transcoded_sha256.filter(|s| !s.is_empty())?;
        let info = envelope.transcode.transcoded_info?;

        Some(TranscodedAudio {
            transcoded_sha256: sha,
            transcoded_info: info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiConfig;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server_uri: &str, attempts: u32) -> ApiClient {
        ApiClient::with_config(ApiConfig {
            api_url: server_uri.to_string(),
            poll_interval: Duration::ZERO,
            poll_attempts: attempts,
        })
    }

    async fn mount_upload_slot(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/media/transcode/audio/uploadUrl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "upload": {
                    "uploadId": "up-1",
                    "uploadUrl": format!("{}/put-target", server.uri()),
                }
            })))
            .mount(server)
            .await;
    }

    fn finished_transcode() -> serde_json::Value {
        serde_json::json!({
            "transcode": {
                "transcodedSha256": "deadbeef",
                "transcodedInfo": {
                    "duration": 12.5,
                    "fileSize": 4096,
                    "channels": 2,
                    "format": "aac",
                }
            }
        })
    }

    #[tokio::test]
    async fn test_upload_and_transcode_happy_path() {
        let server = MockServer::start().await;
        mount_upload_slot(&server).await;

        Mock::given(method("PUT"))
            .and(path("/put-target"))
            .and(header("Content-Type", "audio/mpeg"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        // Two pending polls, then the hash appears.
        Mock::given(method("GET"))
            .and(path("/media/upload/up-1/transcoded"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "transcode": {}
            })))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/media/upload/up-1/transcoded"))
            .and(query_param("loudnorm", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(finished_transcode()))
            .mount(&server)
            .await;

        let audio = client_for(&server.uri(), 30)
            .upload_and_transcode("tok", b"ID3audio".to_vec())
            .await
            .unwrap();

        assert_eq!(audio.transcoded_sha256, "deadbeef");
        assert_eq!(audio.track_url(), "yoto:#deadbeef");
        assert_eq!(audio.transcoded_info.channels, 2);
    }

    #[tokio::test]
    async fn test_transcode_timeout_after_budget() {
        let server = MockServer::start().await;
        mount_upload_slot(&server).await;

        Mock::given(method("PUT"))
            .and(path("/put-target"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        // The hash never appears.
        Mock::given(method("GET"))
            .and(path("/media/upload/up-1/transcoded"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "transcode": {"transcodedSha256": null}
            })))
            .expect(5)
            .mount(&server)
            .await;

        let err = client_for(&server.uri(), 5)
            .upload_and_transcode("tok", vec![0u8; 16])
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::TranscodeTimeout));
    }

    #[tokio::test]
    async fn test_non_success_poll_counts_as_not_ready() {
        let server = MockServer::start().await;
        mount_upload_slot(&server).await;

        Mock::given(method("PUT"))
            .and(path("/put-target"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/media/upload/up-1/transcoded"))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/media/upload/up-1/transcoded"))
            .respond_with(ResponseTemplate::new(200).set_body_json(finished_transcode()))
            .mount(&server)
            .await;

        let audio = client_for(&server.uri(), 5)
            .upload_and_transcode("tok", vec![0u8; 16])
            .await
            .unwrap();
        assert_eq!(audio.transcoded_sha256, "deadbeef");
    }

    #[tokio::test]
    async fn test_rejected_byte_upload_is_upload_failed() {
        let server = MockServer::start().await;
        mount_upload_slot(&server).await;

        Mock::given(method("PUT"))
            .and(path("/put-target"))
            .respond_with(ResponseTemplate::new(403).set_body_string("signature expired"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server.uri(), 5)
            .upload_and_transcode("tok", vec![0u8; 16])
            .await
            .unwrap_err();

        match err {
            ApiError::UploadFailed(msg) => assert!(msg.contains("signature expired")),
            other => panic!("Expected UploadFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_slot_request_is_upload_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/transcode/audio/uploadUrl"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = client_for(&server.uri(), 5)
            .upload_and_transcode("tok", vec![0u8; 16])
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::UploadFailed(_)));
    }
}
