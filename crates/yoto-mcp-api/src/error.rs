//! Error types for content API operations.

use thiserror::Error;

/// Result type for content API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur talking to the content API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The upload slot request or the byte upload was rejected.
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Transcoding did not finish within the polling budget.
    #[error("Transcoding timed out")]
    TranscodeTimeout,

    /// The API returned a non-success status; the body is kept verbatim.
    #[error("API request failed with HTTP {status}: {body}")]
    RemoteRejected { status: u16, body: String },

    /// The API returned a body that does not match the expected schema.
    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
